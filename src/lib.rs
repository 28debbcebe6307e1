//! # vrpad-bridge Library
//!
//! Drive a virtual gamepad from VR hand controllers and head tracking.
//!
//! This library provides the input transformation pipeline: controller
//! snapshot differencing, gesture calibration of the head reference, axis
//! conditioning, D-pad quantization and configurable button remapping for
//! DS4 and XInput style virtual controllers.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod gamepad;
pub mod mapping;
pub mod tracking;
