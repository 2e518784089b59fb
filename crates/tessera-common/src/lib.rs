//! Common utilities for the Tessera box-tree engine.
//!
//! This crate provides shared infrastructure used by all components:
//! - **Warning System** - de-duplicated warnings for unsupported or malformed input

pub mod warning;
