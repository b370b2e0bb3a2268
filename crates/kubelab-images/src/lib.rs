//! # kubelab-images
//!
//! Image workflows for the workshop scenarios.
//!
//! Handles:
//! - **Catalog**: The scenario images and their build contexts.
//! - **Toolchain**: The docker CLI seam, faked in tests.
//! - **Build**: Build every image and push both tags.
//! - **Pull**: Pre-pull every image for offline use.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod build;
pub mod catalog;
pub mod check;
pub mod error;
pub mod pull;
pub mod report;
pub mod toolchain;

#[cfg(test)]
pub(crate) mod testing;
