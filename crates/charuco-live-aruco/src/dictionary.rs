//! Marker dictionaries: loading, validation and deterministic generation.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::matcher::rotations;

/// An ArUco-style dictionary.
///
/// JSON layout: `{"name", "marker_size", "max_correction_bits", "codes"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    /// Human-readable name (for logging).
    pub name: String,
    /// Marker side length in bits, without the black border.
    pub marker_size: usize,
    /// Maximum number of bit errors the dictionary can correct.
    pub max_correction_bits: u8,
    /// One code per marker id, inner bits row-major with **black = 1**.
    pub codes: Vec<u64>,
}

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error("failed to access dictionary file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid dictionary JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("marker_size {0} is not supported (expected 2..=8)")]
    MarkerSize(usize),
    #[error("dictionary has no codes")]
    Empty,
    #[error("code #{index} ({code:#x}) does not fit in {bits} bits")]
    CodeOutOfRange { index: usize, code: u64, bits: usize },
    #[error("code #{index} repeats an earlier marker (up to rotation)")]
    Duplicate { index: usize },
    #[error("could only generate {generated} of {requested} markers")]
    Exhausted { generated: usize, requested: usize },
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn validate(&self) -> Result<(), DictionaryError> {
        if !(2..=8).contains(&self.marker_size) {
            return Err(DictionaryError::MarkerSize(self.marker_size));
        }
        if self.codes.is_empty() {
            return Err(DictionaryError::Empty);
        }
        let bits = self.bit_count();
        let mask = bit_mask(bits);
        for (index, &code) in self.codes.iter().enumerate() {
            if code & !mask != 0 {
                return Err(DictionaryError::CodeOutOfRange { index, code, bits });
            }
        }
        let mut owner: HashMap<u64, usize> = HashMap::with_capacity(self.codes.len() * 4);
        for (index, &code) in self.codes.iter().enumerate() {
            for r in rotations(code, self.marker_size) {
                match owner.insert(r, index) {
                    Some(prev) if prev != index => {
                        return Err(DictionaryError::Duplicate { index })
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> Result<Self, DictionaryError> {
        let dict: Self = serde_json::from_str(s)?;
        dict.validate()?;
        Ok(dict)
    }

    /// Load and validate a dictionary JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dict: Self = serde_json::from_reader(BufReader::new(file))?;
        dict.validate()?;
        log::debug!(
            "loaded dictionary {} ({} markers, {}x{} bits) from {}",
            dict.name,
            dict.len(),
            dict.marker_size,
            dict.marker_size,
            path.display()
        );
        Ok(dict)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DictionaryError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Deterministically generate `count` markers.
    ///
    /// Candidates come from a seeded generator and are accepted greedily when
    /// their rotation-aware Hamming distance to every accepted marker (and to
    /// their own rotations) reaches the current target. The target starts at
    /// the bit count and drops by one after 2000 rejections in a row.
    pub fn generate(
        name: impl Into<String>,
        marker_size: usize,
        count: usize,
        seed: u64,
    ) -> Result<Self, DictionaryError> {
        if !(2..=8).contains(&marker_size) {
            return Err(DictionaryError::MarkerSize(marker_size));
        }
        if count == 0 {
            return Err(DictionaryError::Empty);
        }
        const ATTEMPTS_PER_LEVEL: usize = 2000;

        let bits = marker_size * marker_size;
        let mask = bit_mask(bits);
        let mut rng = SplitMix64(seed);
        let mut codes: Vec<u64> = Vec::with_capacity(count);
        let mut accepted: Vec<[u64; 4]> = Vec::with_capacity(count);
        let mut target = bits as u32;
        let mut min_seen = u32::MAX;
        let mut failures = 0usize;

        while codes.len() < count {
            let cand = rng.next() & mask;
            let rots = rotations(cand, marker_size);
            let self_dist = rots[1..]
                .iter()
                .map(|&r| (cand ^ r).count_ones())
                .min()
                .unwrap_or(0);
            let dist = accepted
                .iter()
                .flatten()
                .map(|&r| (cand ^ r).count_ones())
                .min()
                .unwrap_or(u32::MAX)
                .min(self_dist);

            if dist >= target {
                min_seen = min_seen.min(dist);
                accepted.push(rots);
                codes.push(cand);
                failures = 0;
                continue;
            }
            failures += 1;
            if failures >= ATTEMPTS_PER_LEVEL {
                failures = 0;
                if target <= 1 {
                    return Err(DictionaryError::Exhausted {
                        generated: codes.len(),
                        requested: count,
                    });
                }
                target -= 1;
            }
        }

        let max_correction_bits = (min_seen.saturating_sub(1) / 2) as u8;
        Ok(Self {
            name: name.into(),
            marker_size,
            max_correction_bits,
            codes,
        })
    }
}

#[inline]
fn bit_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

struct SplitMix64(u64);

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}
