//! Code matching and rotation helpers.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Quarter turns `0..=3` with `observed == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Bit errors after rotation.
    pub hamming: u8,
}

/// Brute-force matcher over all ids and rotations.
///
/// Dictionaries here hold at most a few thousand codes, so a linear scan of
/// precomputed rotations with `count_ones` is fast enough per candidate.
#[derive(Clone, Debug)]
pub struct Matcher {
    marker_size: usize,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    pub fn new(dict: &Dictionary, max_hamming: u8) -> Self {
        Self {
            marker_size: dict.marker_size,
            max_hamming,
            rotated: dict
                .codes
                .iter()
                .map(|&c| rotations(c, dict.marker_size))
                .collect(),
        }
    }

    #[inline]
    pub fn marker_size(&self) -> usize {
        self.marker_size
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; ties go to the lower id.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming || best.is_some_and(|b| b.hamming <= h) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming: h,
                });
                if h == 0 {
                    return best;
                }
            }
        }
        best
    }
}

/// Rotate a row-major code (`idx = y * n + x`) by `rot` clockwise quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

pub(crate) fn rotations(code: u64, n: usize) -> [u64; 4] {
    [0u8, 1, 2, 3].map(|r| rotate_code_u64(code, n, r))
}

/// Smallest Hamming distance between `a` and any rotation of `b`.
pub fn min_rotation_distance(a: u64, b: u64, n: usize) -> u32 {
    rotations(b, n)
        .iter()
        .map(|&r| (a ^ r).count_ones())
        .min()
        .unwrap_or(0)
}
