//! Shared test utilities for the depot workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published,
//! and deliberately depends on no workspace crate so the crates it serves
//! can dev-depend on it without a cycle.
//!
//! # Modules
//!
//! - [`workspace`]: [`TestWorkspace`] builder and archive fixtures

pub mod workspace;

pub use workspace::{TestWorkspace, zip_fixture};
