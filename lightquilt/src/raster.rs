//! Re-projection of every input ray against every frame: classification,
//! filtered radiance accumulation, inpainting, and the top-level driver.

mod bundle;
pub use bundle::*;

mod classify;
pub use classify::*;

mod accum;
pub use accum::*;

mod inpaint;
pub use inpaint::*;

mod rasterizer;
pub use rasterizer::*;
