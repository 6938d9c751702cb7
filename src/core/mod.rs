//! Core domain models for build configurations
//!
//! This module defines the data structures that describe a build
//! configuration, its tests, and the steps those tests are made of.

pub mod config;
pub(crate) mod scalar;
pub mod step;

pub use config::*;
pub use step::*;
pub use test::*;
