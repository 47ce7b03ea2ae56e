//! Internal utilities for trimstage.
//!
//! Small `const fn` helpers shared by the core crate. Nothing here touches
//! audio data.
//!
//! # Contents
//!
//! - [`fnv1a_32`] - FNV-1a hash used to derive parameter IDs

pub mod hash;

pub use hash::fnv1a_32;
