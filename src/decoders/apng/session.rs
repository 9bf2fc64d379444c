use std::io::{Read, Seek};
use std::ops::Range;

use crate::decoders::apng::frame::{DataRange, FrameDescriptor, FrameRect};
use crate::decoders::apng::store::FrameStore;
use crate::decoders::png::chunk::{ChunkPrefix, PngChunk};
use crate::decoders::png::engine::{FeedStatus, NoRows, PngEngine, RowControl, RowSink};
use crate::decoders::png::header::ImageHeader;
use crate::decoders::png::interlace::{combine_row, final_pass_row};
use crate::decoders::png::transform::{RowTransform, RGBA_BYTES_PER_PIXEL};
use crate::log_debug;
use crate::utils::error::{ApngError, ApngResult};
use crate::utils::reader::ByteReader;
use crate::utils::traits::SafeAccess;

const REPLAY_BUFFER_SIZE: usize = 4096;

/// Per-call decode settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Canvas rows to produce. Rows outside the range are left zeroed. `None` means all rows.
    pub rows: Option<Range<u32>>,
}

impl DecodeOptions {
    pub fn rows(rows: Range<u32>) -> Self {
        DecodeOptions { rows: Some(rows) }
    }
}

/// Where the compressed image data comes from.
#[derive(Clone, Copy)]
enum FrameSource<'a> {
    /// IDAT chunks read straight from the stream, starting at the first IDAT prefix.
    Stream { offset: u64 },
    /// fdAT payloads, re-wrapped as IDAT chunks.
    Ranges(&'a [DataRange]),
}

/// Decodes one frame with its own engine instance and places it on a zeroed canvas.
pub struct FrameDecodeSession<'a, R: Read + Seek> {
    reader: &'a mut ByteReader<R>,
    engine: PngEngine,
    header_bytes: Vec<u8>,
    rect: FrameRect,
    canvas_height: u32,
    source: FrameSource<'a>,
}

impl<'a, R: Read + Seek> FrameDecodeSession<'a, R> {
    /// Session for the IDAT image, decoded at canvas size from the original bytes.
    pub fn for_base_image(reader: &'a mut ByteReader<R>, store: &FrameStore) -> Self {
        FrameDecodeSession {
            reader,
            engine: PngEngine::new(),
            header_bytes: store.header().as_bytes().to_vec(),
            rect: store.canvas(),
            canvas_height: store.canvas_height(),
            source: FrameSource::Stream {
                offset: store.base_data_offset(),
            },
        }
    }

    /// Session replaying a frame's fdAT data against a header resized to the frame rect.
    pub fn for_frame(reader: &'a mut ByteReader<R>, store: &FrameStore, frame: &'a FrameDescriptor) -> ApngResult<Self> {
        let rect = frame.rect();

        Ok(FrameDecodeSession {
            reader,
            engine: PngEngine::new(),
            header_bytes: store.header().patched(rect.width, rect.height)?,
            rect,
            canvas_height: store.canvas_height(),
            source: FrameSource::Ranges(frame.data_ranges()),
        })
    }

    /// Decodes into `dst`, a canvas of `row_bytes` stride.
    ///
    /// The whole canvas is zeroed first. When the data runs out early the rows decoded so far are
    /// still placed and `IncompleteInput` is returned.
    pub fn decode_into(mut self, dst: &mut [u8], row_bytes: usize, options: &DecodeOptions) -> ApngResult<()> {
        let canvas_len = canvas_offset(row_bytes, self.canvas_height as usize, 0, dst.len())?;
        dst.get_range_mut_safe(0..canvas_len)?.fill(0);

        let rows = self.local_rows(options);
        if rows.is_empty() {
            return Ok(());
        }

        let header_bytes = std::mem::take(&mut self.header_bytes);
        if self.engine.feed(&header_bytes, &mut NoRows)? != FeedStatus::NeedMore {
            return Err(ApngError::CorruptData("image header ended prematurely".to_string()));
        }

        let header = *self
            .engine
            .header()
            .ok_or_else(|| ApngError::CorruptData("missing IHDR".to_string()))?;

        if header.width != self.rect.width || header.height != self.rect.height {
            return Err(ApngError::CorruptData(format!(
                "decoder initialized for {}x{}, frame is {}x{}",
                header.width, header.height, self.rect.width, self.rect.height
            )));
        }

        let raw_stride = self
            .engine
            .row_bytes()
            .ok_or_else(|| ApngError::CorruptData("missing IHDR".to_string()))?;
        let transform = RowTransform::new(&header, self.engine.palette(), self.engine.transparency());
        let mut frame_rows = FrameRows::new(header, transform, rows.clone(), raw_stride);

        let status = frame_rows.decode(&mut self)?;
        let decoded = frame_rows.finish();
        log_debug!(
            "Decoded {} of {} rows of a {}x{} frame ({:?})",
            decoded.rows,
            rows.len(),
            self.rect.width,
            self.rect.height,
            status
        );

        composite(dst, row_bytes, self.rect, rows.start, &decoded)?;

        if (decoded.rows as usize) < rows.len() {
            return Err(ApngError::IncompleteInput {
                rows_decoded: decoded.rows,
            });
        }

        Ok(())
    }

    /// Requested canvas rows, clipped to the frame and made frame-relative.
    fn local_rows(&self, options: &DecodeOptions) -> Range<u32> {
        let wanted = options.rows.clone().unwrap_or(0..self.canvas_height);
        let start = wanted.start.max(self.rect.y);
        let end = wanted.end.min(self.canvas_height).min(self.rect.y + self.rect.height);

        if start >= end {
            return 0..0;
        }

        (start - self.rect.y)..(end - self.rect.y)
    }

    /// Feeds the frame's compressed data until the sink stops or the data is exhausted.
    fn replay(&mut self, sink: &mut dyn RowSink) -> ApngResult<FeedStatus> {
        let mut buffer = vec![0u8; REPLAY_BUFFER_SIZE];

        match self.source {
            FrameSource::Stream { offset } => {
                self.reader.seek_to(offset)?;

                loop {
                    let read = self.reader.read_up_to(&mut buffer)?;
                    if read == 0 {
                        return Ok(FeedStatus::NeedMore);
                    }

                    let status = self.engine.feed(&buffer[..read], sink)?;
                    if status != FeedStatus::NeedMore {
                        return Ok(status);
                    }
                }
            }
            FrameSource::Ranges(ranges) => {
                for range in ranges {
                    let status = self.replay_range(*range, &mut buffer, sink)?;
                    if status != FeedStatus::NeedMore {
                        return Ok(status);
                    }
                }

                Ok(FeedStatus::NeedMore)
            }
        }
    }

    fn replay_range(&mut self, range: DataRange, buffer: &mut [u8], sink: &mut dyn RowSink) -> ApngResult<FeedStatus> {
        let prefix = ChunkPrefix::new(range.length, PngChunk::IDAT);
        let status = self.engine.feed(&prefix.to_bytes(), sink)?;
        if status != FeedStatus::NeedMore {
            return Ok(status);
        }

        self.reader.seek_to(range.offset)?;

        let mut crc = flate2::Crc::new();
        crc.update(&prefix.chunk.tag());

        let mut remaining = range.length as usize;
        while remaining > 0 {
            let want = remaining.min(buffer.len());
            let read = self.reader.read_up_to(&mut buffer[..want])?;
            if read == 0 {
                log_debug!("Frame data ended {} bytes early", remaining);
                return Ok(FeedStatus::NeedMore);
            }

            crc.update(&buffer[..read]);
            let status = self.engine.feed(&buffer[..read], sink)?;
            if status != FeedStatus::NeedMore {
                return Ok(status);
            }

            remaining -= read;
        }

        self.engine.feed(&crc.sum().to_be_bytes(), sink)
    }
}

/// RGBA8 rows produced for a frame, starting at the first requested row.
struct DecodedRows {
    pixels: Vec<u8>,
    stride: usize,
    rows: u32,
}

/// Row handling for the two PNG layouts.
enum FrameRows {
    Normal(NormalRows),
    Interlaced(InterlacedRows),
}

impl FrameRows {
    fn new(header: ImageHeader, transform: RowTransform, rows: Range<u32>, raw_stride: usize) -> Self {
        if header.interlaced {
            FrameRows::Interlaced(InterlacedRows::new(header, transform, rows, raw_stride))
        } else {
            FrameRows::Normal(NormalRows::new(header, transform, rows))
        }
    }

    fn decode<R: Read + Seek>(&mut self, session: &mut FrameDecodeSession<'_, R>) -> ApngResult<FeedStatus> {
        session.replay(self)
    }

    fn finish(self) -> DecodedRows {
        match self {
            FrameRows::Normal(rows) => rows.finish(),
            FrameRows::Interlaced(rows) => rows.finish(),
        }
    }
}

impl RowSink for FrameRows {
    fn on_row(&mut self, row: &[u8], row_num: u32, pass: u8) -> RowControl {
        match self {
            FrameRows::Normal(rows) => rows.on_row(row, row_num),
            FrameRows::Interlaced(rows) => rows.on_row(row, row_num, pass),
        }
    }
}

/// Rows arrive top to bottom and are converted as they come.
struct NormalRows {
    transform: RowTransform,
    width: usize,
    rows: Range<u32>,
    pixels: Vec<u8>,
    written: u32,
}

impl NormalRows {
    fn new(header: ImageHeader, transform: RowTransform, rows: Range<u32>) -> Self {
        let width = header.width as usize;

        NormalRows {
            transform,
            width,
            pixels: vec![0u8; width * RGBA_BYTES_PER_PIXEL * rows.len()],
            rows,
            written: 0,
        }
    }

    fn on_row(&mut self, row: &[u8], row_num: u32) -> RowControl {
        if row_num < self.rows.start {
            return RowControl::Continue;
        }

        let stride = self.width * RGBA_BYTES_PER_PIXEL;
        let start = self.written as usize * stride;
        match self.pixels.get_mut(start..start + stride) {
            Some(out) => self.transform.apply(row, self.width, out),
            None => return RowControl::Stop,
        }

        self.written += 1;
        if self.written as usize == self.rows.len() {
            RowControl::Stop
        } else {
            RowControl::Continue
        }
    }

    fn finish(self) -> DecodedRows {
        DecodedRows {
            stride: self.width * RGBA_BYTES_PER_PIXEL,
            pixels: self.pixels,
            rows: self.written,
        }
    }
}

/// Pass rows refine a raw frame buffer; conversion happens once the last needed pass row is in.
struct InterlacedRows {
    transform: RowTransform,
    header: ImageHeader,
    rows: Range<u32>,
    raw: Vec<u8>,
    raw_stride: usize,
    final_row: Option<(u8, u32)>,
    deepest_row: Option<u32>,
    complete: bool,
}

impl InterlacedRows {
    fn new(header: ImageHeader, transform: RowTransform, rows: Range<u32>, raw_stride: usize) -> Self {
        let final_row = final_pass_row(header.width, header.height, rows.start, rows.end.saturating_sub(1));

        InterlacedRows {
            transform,
            header,
            raw: vec![0u8; raw_stride * rows.len()],
            raw_stride,
            rows,
            final_row,
            deepest_row: None,
            complete: false,
        }
    }

    fn on_row(&mut self, row: &[u8], row_num: u32, pass: u8) -> RowControl {
        if self.complete {
            return RowControl::Stop;
        }

        if self.rows.contains(&row_num) {
            let start = (row_num - self.rows.start) as usize * self.raw_stride;
            if let Some(target) = self.raw.get_mut(start..start + self.raw_stride) {
                combine_row(pass, self.header.bits_per_pixel(), self.header.width, row, target);
            }

            self.deepest_row = Some(self.deepest_row.map_or(row_num, |deepest| deepest.max(row_num)));
        }

        if self.final_row == Some((pass, row_num)) {
            self.complete = true;
            return RowControl::Stop;
        }

        RowControl::Continue
    }

    fn finish(self) -> DecodedRows {
        let rows = if self.complete {
            self.rows.len() as u32
        } else {
            self.deepest_row.map_or(0, |deepest| deepest - self.rows.start + 1)
        };

        let width = self.header.width as usize;
        let stride = width * RGBA_BYTES_PER_PIXEL;
        let mut pixels = vec![0u8; stride * rows as usize];

        for (raw, out) in self.raw.chunks_exact(self.raw_stride).zip(pixels.chunks_exact_mut(stride)) {
            self.transform.apply(raw, width, out);
        }

        DecodedRows { pixels, stride, rows }
    }
}

/// Copies decoded rows to their place on the canvas. `first_row` is frame-relative.
fn composite(dst: &mut [u8], row_bytes: usize, rect: FrameRect, first_row: u32, decoded: &DecodedRows) -> ApngResult<()> {
    let x_offset = rect.x as usize * RGBA_BYTES_PER_PIXEL;

    for r in 0..decoded.rows as usize {
        let src = decoded
            .pixels
            .get_range_safe(r * decoded.stride..(r + 1) * decoded.stride)?;

        let y = rect.y as usize + first_row as usize + r;
        let start = canvas_offset(row_bytes, y, x_offset, dst.len())?;
        let end = canvas_offset(row_bytes, y, x_offset + decoded.stride, dst.len())?;
        dst.get_range_mut_safe(start..end)?.copy_from_slice(src);
    }

    Ok(())
}

/// `row * row_bytes + byte`, or `BufferTooSmall` when it overflows.
fn canvas_offset(row_bytes: usize, row: usize, byte: usize, dst_len: usize) -> ApngResult<usize> {
    row_bytes
        .checked_mul(row)
        .and_then(|offset| offset.checked_add(byte))
        .ok_or(ApngError::BufferTooSmall {
            required: usize::MAX,
            actual: dst_len,
        })
}
