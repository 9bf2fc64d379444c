pub mod decoders;
pub mod utils;

#[doc(hidden)]
pub use log as __log;

pub use decoders::apng::dependency::{ApngDependencyRule, FrameDependencyRule};
pub use decoders::apng::frame::{BlendMode, DataRange, DisposalMethod, FrameDescriptor, FrameInfo, FrameRect};
pub use decoders::apng::session::DecodeOptions;
pub use decoders::apng::store::FrameStore;
pub use utils::error::{ApngError, ApngResult};
pub use utils::{logger, writer};

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::decoders::apng::scanner::ChunkScanner;
use crate::decoders::apng::session::FrameDecodeSession;
use crate::decoders::png::transform::RGBA_BYTES_PER_PIXEL;
use crate::utils::reader::ByteReader;

/// Animated PNG decoder.
///
/// Opening a stream scans its chunk list once to index the frames; each `decode_frame` call then
/// decodes a single frame with a fresh engine, so frames can be requested in any order. Decoded
/// pixels are RGBA8 and are never cached.
///
/// Streams without a valid animation decode as a single frame holding the ordinary PNG image.
pub struct ApngCodec<R: Read + Seek> {
    reader: ByteReader<R>,
    store: Arc<FrameStore>,
}

impl ApngCodec<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> ApngResult<ApngCodec<BufReader<File>>> {
        let file = File::open(path)?;
        ApngCodec::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ApngCodec<R> {
    pub fn new(reader: R) -> ApngResult<Self> {
        Self::with_dependency_rule(reader, &ApngDependencyRule)
    }

    /// Opens the stream, computing each frame's required frame with `rule`.
    pub fn with_dependency_rule(reader: R, rule: &dyn FrameDependencyRule) -> ApngResult<Self> {
        let mut reader = ByteReader::new(reader);
        let store = ChunkScanner::new(&mut reader, rule)?.scan()?;

        Ok(ApngCodec {
            reader,
            store: Arc::new(store),
        })
    }

    fn with_store(reader: R, store: Arc<FrameStore>) -> Self {
        ApngCodec {
            reader: ByteReader::new(reader),
            store,
        }
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.store.canvas_width()
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.store.canvas_height()
    }

    pub fn is_animated(&self) -> bool {
        self.store.is_animated()
    }

    pub fn frame_count(&self) -> u32 {
        self.store.frame_count()
    }

    /// Number of times the animation plays; 0 means forever. Still images report 1.
    pub fn repetition_count(&self) -> u32 {
        self.store.repetition_count()
    }

    pub fn frame_info(&self, index: u32) -> ApngResult<FrameInfo> {
        self.store.frame_info(index).ok_or(ApngError::FrameOutOfRange {
            index,
            frame_count: self.frame_count(),
        })
    }

    pub fn frame_infos(&self) -> Vec<FrameInfo> {
        (0..self.frame_count()).filter_map(|i| self.store.frame_info(i)).collect()
    }

    /// Scan results, including the recorded data ranges of every frame.
    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Smallest destination stride accepted by `decode_frame`.
    pub fn min_row_bytes(&self) -> usize {
        self.width() as usize * RGBA_BYTES_PER_PIXEL
    }

    /// Decodes frame `index` into `dst`, a canvas of `height()` rows spaced `row_bytes` apart.
    ///
    /// The canvas is zeroed and the frame's pixels are placed at its offset; disposal and
    /// blending are left to the caller.
    ///
    /// # Errors
    /// - `FrameOutOfRange` for an index outside `0..frame_count()`
    /// - `IncompleteInput` when the stream ends early; the decoded rows are still written
    /// - `CorruptData` for damaged image data in this frame
    pub fn decode_frame(&mut self, index: u32, dst: &mut [u8], row_bytes: usize) -> ApngResult<()> {
        self.decode_frame_with(index, dst, row_bytes, &DecodeOptions::default())
    }

    pub fn decode_frame_with(
        &mut self,
        index: u32,
        dst: &mut [u8],
        row_bytes: usize,
        options: &DecodeOptions,
    ) -> ApngResult<()> {
        let frame_count = self.frame_count();
        if index >= frame_count {
            return Err(ApngError::FrameOutOfRange { index, frame_count });
        }

        let minimum = self.min_row_bytes();
        if row_bytes < minimum {
            return Err(ApngError::InvalidRowBytes { row_bytes, minimum });
        }

        let required = row_bytes
            .checked_mul(self.height() as usize)
            .ok_or(ApngError::BufferTooSmall {
                required: usize::MAX,
                actual: dst.len(),
            })?;
        if dst.len() < required {
            return Err(ApngError::BufferTooSmall {
                required,
                actual: dst.len(),
            });
        }

        let store = &self.store;
        let session = match store.frame(index) {
            Some(frame) if !frame.uses_base_image() => FrameDecodeSession::for_frame(&mut self.reader, store, frame)?,
            _ => FrameDecodeSession::for_base_image(&mut self.reader, store),
        };

        session.decode_into(dst, row_bytes, options)
    }

    /// Decodes frame `index` into a new tightly packed RGBA8 canvas.
    pub fn decode_frame_to_vec(&mut self, index: u32) -> ApngResult<Vec<u8>> {
        let row_bytes = self.min_row_bytes();
        let mut pixels = vec![0u8; row_bytes * self.height() as usize];
        self.decode_frame(index, &mut pixels, row_bytes)?;
        Ok(pixels)
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

/// Decodes every frame of an in-memory stream into its own RGBA8 canvas.
///
/// The stream is scanned once; each frame is then decoded by an independent codec sharing the
/// scan results, in parallel when the `rayon` feature is enabled. Frames fail independently.
pub fn decode_all_frames(data: &[u8]) -> ApngResult<Vec<ApngResult<Vec<u8>>>> {
    let codec = ApngCodec::new(Cursor::new(data))?;
    let store = Arc::clone(&codec.store);

    let decode = |index: u32| ApngCodec::with_store(Cursor::new(data), Arc::clone(&store)).decode_frame_to_vec(index);

    #[cfg(feature = "rayon")]
    let frames = {
        use rayon::prelude::*;
        (0..codec.frame_count()).into_par_iter().map(decode).collect()
    };

    #[cfg(not(feature = "rayon"))]
    let frames = (0..codec.frame_count()).map(decode).collect();

    Ok(frames)
}
