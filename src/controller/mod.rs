//! # Controller Module
//!
//! Hand controller and head sensor input handling.
//!
//! This module handles:
//! - Per-frame controller snapshots and tracked poses
//! - Deadzones, sensitivity scaling and clamping
//! - Exponential smoothing of head angles
//! - D-pad octant quantization of the left stick

pub mod conditioning;
pub mod dpad;
pub mod filter;
pub mod state;
