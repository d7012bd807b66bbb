//! Input interfaces: cameras, layered depth images, and view-group loading.
//!
//! Everything in this module is a *consumer-side* contract: the capture
//! pipeline that produces these inputs (file formats, codecs, manifests) is
//! out of scope, so the pipeline operates on the traits and plain data types
//! defined here.

mod camera;
pub use camera::*;

mod ldi;
pub use ldi::*;

mod view_group;
pub use view_group::*;

mod prefetch;
pub use prefetch::*;
