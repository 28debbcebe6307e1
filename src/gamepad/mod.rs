//! # Gamepad Module
//!
//! Virtual-controller side of the bridge.
//!
//! This module handles:
//! - The per-frame output report (sticks, triggers, buttons, D-pad)
//! - Backend vocabularies and device value conventions (DS4, XInput)
//! - The output sink abstraction with commit retry
//! - A JSON Lines report sink for running without a driver

pub mod backend;
pub mod jsonl;
pub mod report;
pub mod sink;
