//! Mathematical utilities for trajectory processing.
//!
//! This module provides:
//! - [`linalg`]: 3-vector helpers and Rodrigues rotations
//! - [`interp`]: piecewise-linear interpolation
//! - [`spline`]: interpolating cubic B-splines

pub mod interp;
pub mod linalg;
pub mod spline;

pub use interp::interp_sorted;
pub use linalg::{norm3, rotation_between};
pub use spline::CubicSpline;
