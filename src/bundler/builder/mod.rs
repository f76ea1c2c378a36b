//! Run orchestration.
//!
//! This module provides the [`Bundler`] orchestrator that walks the target
//! matrix and drives one layout pass per target.
//!
//! # Overview
//!
//! The bundler:
//! 1. Prepares the folder context (empties `build/` and `artifacts/`)
//! 2. Rasterizes the application icon once, if one is configured
//! 3. Bundles every `(os, arch)` pair in configuration order
//! 4. Calculates size and checksum of every artifact
//! 5. Returns a [`RunSummary`](crate::bundler::RunSummary)
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 checksum calculation for artifacts
//! - [`orchestrator`] - Main [`Bundler`] struct and the run loop

mod checksum;
mod orchestrator;

pub use orchestrator::Bundler;
