//! Mathematical utilities and decisions.

mod aab;
pub use aab::*;
mod coord;
pub use coord::*;
mod face;
pub use face::*;

// We make an assumption in several places that `usize` is at least 32 bits.
// It's likely that compilation would not succeed anyway, but let's make it explicit.
#[cfg(target_pointer_width = "16")]
compile_error!("lightquilt does not support platforms with less than 32-bit `usize`");
