//! Full-image marker detection.

use std::collections::HashMap;

use charuco_live_core::{
    min_side_length, quad_perimeter, refine_corner_subpix, rotate_quad, GrayImageView, Quad,
    SubpixParams,
};
use image::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidates::find_candidates;
use crate::decode::CellSampler;
use crate::{CornerRefine, DetectorParams, Dictionary, Matcher};

/// One decoded marker.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerDetection {
    pub id: u32,
    /// Image corners in the marker's canonical order: top-left, top-right,
    /// bottom-right, bottom-left of the printed pattern.
    pub corners: Quad,
    /// Clockwise quarter turns of the printed pattern relative to the
    /// candidate outline, whose first corner is nearest the image origin.
    pub rotation: u8,
    pub hamming: u8,
    pub border_errors: usize,
}

/// Detects dictionary markers in grayscale images.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    dictionary: Dictionary,
    matcher: Matcher,
    params: DetectorParams,
}

impl ArucoDetector {
    pub fn new(dictionary: Dictionary, params: DetectorParams) -> Self {
        let max_hamming = params.max_hamming(dictionary.max_correction_bits);
        let matcher = Matcher::new(&dictionary, max_hamming);
        Self {
            dictionary,
            matcher,
            params,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Detect markers, keeping the best detection per id, sorted by id.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(w = img.width(), h = img.height()))
    )]
    pub fn detect(&self, img: &GrayImage) -> Vec<MarkerDetection> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let Some(view) = GrayImageView::new(w, h, img.as_raw()) else {
            return Vec::new();
        };
        let candidates = find_candidates(img, &self.params);
        let sampler = CellSampler::new(self.dictionary.marker_size, &self.params);

        let mut best: HashMap<u32, MarkerDetection> = HashMap::new();
        for cand in &candidates {
            let Some(det) = self.decode_with(&view, &sampler, &cand.corners) else {
                continue;
            };
            match best.get(&det.id) {
                Some(prev) if !is_better(&det, prev) => {}
                _ => {
                    best.insert(det.id, det);
                }
            }
        }

        let mut out: Vec<MarkerDetection> = best.into_values().collect();
        out.sort_by_key(|d| d.id);
        if self.params.corner_refinement == CornerRefine::Subpix {
            for det in &mut out {
                self.refine_corners(&view, det);
            }
        }
        log::debug!("aruco: {} candidates, {} markers", candidates.len(), out.len());
        out
    }

    /// Decode a quad whose corners are given clockwise on screen.
    ///
    /// No corner refinement is applied.
    pub fn decode_quad(&self, view: &GrayImageView<'_>, quad: &Quad) -> Option<MarkerDetection> {
        let sampler = CellSampler::new(self.dictionary.marker_size, &self.params);
        self.decode_with(view, &sampler, quad)
    }

    /// Sub-pixel refine all four corners in place; corners that fail keep
    /// their previous position.
    pub fn refine_corners(&self, view: &GrayImageView<'_>, det: &mut MarkerDetection) {
        // keep the window inside the marker border
        let cap = (min_side_length(&det.corners) * 0.25).floor() as usize;
        let params = SubpixParams {
            half_window: self.params.corner_refinement_win_size.min(cap).max(1),
            max_iters: self.params.corner_refinement_max_iterations,
            epsilon: self.params.corner_refinement_min_accuracy,
        };
        for c in det.corners.iter_mut() {
            if let Some(p) = refine_corner_subpix(view, *c, &params) {
                *c = p;
            }
        }
    }

    fn decode_with(
        &self,
        view: &GrayImageView<'_>,
        sampler: &CellSampler,
        quad: &Quad,
    ) -> Option<MarkerDetection> {
        let reading = sampler.read(view, quad)?;
        let m = self.matcher.match_code(reading.code)?;
        Some(MarkerDetection {
            id: m.id,
            corners: rotate_quad(quad, m.rotation as usize),
            rotation: m.rotation,
            hamming: m.hamming,
            border_errors: reading.border_errors,
        })
    }
}

// fewer bit errors first, then the larger outline
fn is_better(a: &MarkerDetection, b: &MarkerDetection) -> bool {
    let errors = |d: &MarkerDetection| d.hamming as usize + d.border_errors;
    match errors(a).cmp(&errors(b)) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => quad_perimeter(&a.corners) > quad_perimeter(&b.corners),
    }
}
