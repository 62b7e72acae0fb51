//! Shared utilities for the canvasflow crate.

pub mod id_generator;
