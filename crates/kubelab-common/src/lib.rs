//! # kubelab-common
//!
//! Shared types, error definitions, environment helpers, and constants
//! used across the kubelab workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives that the scenario apps and
//! the image tooling build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
