//! This library is an internal component of [`lightquilt`],
//! which defines the core mathematical types and functions used by the
//! reconstruction pipeline. Do not depend on this library directly;
//! use only `lightquilt` instead.
//!
//! [`lightquilt`]: ../lightquilt/index.html

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

pub mod math;

// reexport for convenience of downstream code and our tests
#[doc(hidden)]
pub use euclid;
