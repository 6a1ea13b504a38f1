//! Core types and utilities for live ChArUco detection.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete image type: detectors hand it borrowed
//! [`GrayImageView`]s and plain `nalgebra` points.

mod geometry;
mod homography;
mod image;
mod logger;
mod subpix;

pub use geometry::{
    is_convex, mean_corner_distance, min_side_length, orient_clockwise, quad_perimeter,
    rotate_quad, signed_area, Quad,
};
pub use homography::Homography;
pub use image::{sample_bilinear, GrayImageView};
pub use subpix::{refine_corner_subpix, SubpixParams};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
