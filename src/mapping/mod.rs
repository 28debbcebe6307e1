//! # Mapping Module
//!
//! Configuration-driven remapping of hand controller inputs onto gamepad
//! buttons and triggers.
//!
//! Two tables exist per backend: the normal table and the shift table used
//! while the left grip is held. The active table is chosen again every
//! frame.

pub mod binding;
pub mod engine;
