//! # Bridge Module
//!
//! Ties tracking input, the transformation pipeline and the output device
//! together.
//!
//! This module handles:
//! - Per-frame pipeline state ([`session::Session`])
//! - Fixed-rate scheduling, commit recovery and calibration acknowledgment
//!   ([`frame_loop::FrameLoop`])

pub mod frame_loop;
pub mod session;
