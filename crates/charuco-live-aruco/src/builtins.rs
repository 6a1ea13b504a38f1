//! Embedded built-in dictionaries.
//!
//! The source-of-truth lives in `charuco-live-aruco/data/*_CODES.json`; any
//! file dropped there is compiled in under the `name` it declares.
#![allow(clippy::unreadable_literal, non_upper_case_globals)]

use crate::Dictionary;

struct Builtin {
    name: &'static str,
    marker_size: usize,
    max_correction_bits: u8,
    codes: &'static [u64],
}

include!(concat!(env!("OUT_DIR"), "/builtins.rs"));

/// Look up an embedded dictionary by name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    BUILTINS.iter().find(|b| b.name == name).map(|b| Dictionary {
        name: b.name.to_string(),
        marker_size: b.marker_size,
        max_correction_bits: b.max_correction_bits,
        codes: b.codes.to_vec(),
    })
}

/// Names of every embedded dictionary.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::min_rotation_distance;

    #[test]
    fn live_4x4_1000_is_embedded_and_valid() {
        let dict = builtin_dictionary("LIVE_4X4_1000").expect("builtin dict");
        assert_eq!(dict.len(), 1000);
        assert_eq!(dict.marker_size, 4);
        assert_eq!(dict.codes, LIVE_4X4_1000_CODES);
        dict.validate().expect("valid");
        assert!(builtin_names().any(|n| n == "LIVE_4X4_1000"));
    }

    #[test]
    fn leading_markers_keep_a_wider_gap() {
        // the first ids are picked at distance 3, which covers common board sizes
        let dict = builtin_dictionary("LIVE_4X4_1000").expect("builtin dict");
        let head = &dict.codes[..36];
        for i in 0..head.len() {
            for j in (i + 1)..head.len() {
                assert!(min_rotation_distance(head[i], head[j], 4) >= 3);
            }
        }
    }

    #[test]
    fn unknown_names_are_not_found() {
        assert!(builtin_dictionary("DICT_NOPE").is_none());
    }
}
