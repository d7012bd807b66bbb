use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};
use euclid::point3;

use crate::frame::{Frame, GenerateError, GenerateFrames};

// -------------------------------------------------------------------------------------------------

/// The fixed-layout on-disk form of a [`Frame`], for the geometry cache.
///
/// 136 bytes, no padding. The cache file is simply a concatenation of these
/// records; there is no header, version, or checksum.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct FrameRecord {
    corners: [[f64; 3]; 4],
    texcoord_w: [f64; 4],
    draw_order: i64,
}

impl From<&Frame> for FrameRecord {
    fn from(frame: &Frame) -> Self {
        Self {
            corners: frame.corners.map(|c| [c.x, c.y, c.z]),
            texcoord_w: frame.texcoord_w,
            draw_order: i64::from(frame.draw_order),
        }
    }
}

impl From<FrameRecord> for Frame {
    fn from(record: FrameRecord) -> Self {
        Self {
            corners: record.corners.map(|[x, y, z]| point3(x, y, z)),
            texcoord_w: record.texcoord_w,
            draw_order: record.draw_order as i32,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Wraps a [`GenerateFrames`] implementation with a raw byte-dump disk
/// cache, so that repeated runs against the same captures skip the (slow)
/// point cloud and tiling work.
///
/// This is a development convenience, not a durability contract: validity is
/// checked only by the file size being a whole number of records, and
/// invalidation is manual (delete the file). Any unreadable or ill-sized
/// cache is discarded, with a warning, and regenerated.
#[derive(Debug)]
pub struct CachedFrameGenerator<G> {
    path: PathBuf,
    inner: G,
}

impl<G: GenerateFrames> CachedFrameGenerator<G> {
    /// Wraps `inner`, caching its output at `path`.
    pub fn new(path: PathBuf, inner: G) -> Self {
        Self { path, inner }
    }

    fn read_cache(&self) -> Option<Vec<Frame>> {
        const RECORD_SIZE: usize = size_of::<FrameRecord>();
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return None,
            Err(error) => {
                log::warn!(
                    "unreadable frame cache {path}: {error}; regenerating",
                    path = self.path.display()
                );
                return None;
            }
        };
        if bytes.len() % RECORD_SIZE != 0 {
            log::warn!(
                "frame cache {path} has invalid size {len}; regenerating",
                path = self.path.display(),
                len = bytes.len()
            );
            return None;
        }
        Some(
            bytes
                .chunks_exact(RECORD_SIZE)
                .map(|chunk| Frame::from(bytemuck::pod_read_unaligned::<FrameRecord>(chunk)))
                .collect(),
        )
    }

    fn write_cache(&self, frames: &[Frame]) {
        let mut bytes = Vec::with_capacity(frames.len() * size_of::<FrameRecord>());
        for frame in frames {
            bytes.extend_from_slice(bytemuck::bytes_of(&FrameRecord::from(frame)));
        }
        if let Err(error) = fs::write(&self.path, bytes) {
            // A failed cache write only costs the next run time, not
            // correctness.
            log::warn!(
                "failed to write frame cache {path}: {error}",
                path = self.path.display()
            );
        }
    }
}

impl<G: GenerateFrames> GenerateFrames for CachedFrameGenerator<G> {
    fn generate_frames(&mut self) -> Result<Vec<Frame>, GenerateError> {
        if let Some(frames) = self.read_cache() {
            log::info!(
                "loaded {count} frames from cache {path}",
                count = frames.len(),
                path = self.path.display()
            );
            return Ok(frames);
        }
        let frames = self.inner.generate_frames()?;
        self.write_cache(&frames);
        Ok(frames)
    }
}

// -------------------------------------------------------------------------------------------------
