use std::io::{Read, Seek};

use crate::decoders::apng::dependency::FrameDependencyRule;
use crate::decoders::apng::frame::{normalize_duration, BlendMode, DataRange, DisposalMethod, FrameDescriptor, FrameRect};
use crate::decoders::apng::header::AnimationHeader;
use crate::decoders::apng::store::FrameStore;
use crate::decoders::png::chunk::{
    read_u16_be, read_u32_be, ChunkPrefix, PngChunk, ACTL_LEN, CHUNK_PREFIX_LEN, FCTL_LEN, IHDR_LEN, PNG_SIGNATURE,
    PNG_UINT_31_MAX,
};
use crate::decoders::png::header::ImageHeader;
use crate::utils::error::{ApngError, ApngResult};
use crate::utils::reader::ByteReader;
use crate::{log_debug, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy)]
struct ActlChunk {
    num_frames: u32,
    num_plays: u32,
}

#[derive(Debug, Clone, Copy)]
struct FctlChunk {
    sequence_number: u32,
    width: u32,
    height: u32,
    x_offset: u32,
    y_offset: u32,
    delay_num: u16,
    delay_den: u16,
    dispose_op: u8,
    blend_op: u8,
}

impl FctlChunk {
    fn parse(data: &[u8]) -> Option<Self> {
        Some(FctlChunk {
            sequence_number: read_u32_be(data, 0)?,
            width: read_u32_be(data, 4)?,
            height: read_u32_be(data, 8)?,
            x_offset: read_u32_be(data, 12)?,
            y_offset: read_u32_be(data, 16)?,
            delay_num: read_u16_be(data, 20)?,
            delay_den: read_u16_be(data, 22)?,
            dispose_op: *data.get(24)?,
            blend_op: *data.get(25)?,
        })
    }

    fn rect(&self) -> FrameRect {
        FrameRect::new(self.x_offset, self.y_offset, self.width, self.height)
    }
}

/// Walks the chunk list once and builds the [`FrameStore`].
///
/// Only chunk prefixes and the small control payloads (IHDR, acTL, fcTL, fdAT sequence numbers)
/// are read; frame data is recorded as offsets into the stream.
pub struct ChunkScanner<'a, R: Read + Seek> {
    reader: &'a mut ByteReader<R>,
    rule: &'a dyn FrameDependencyRule,
    stream_len: u64,
    ihdr: Option<ImageHeader>,
    ihdr_offset: Option<u64>,
    has_transparency: bool,
    canvas: Option<FrameRect>,
    header: Option<AnimationHeader>,
    base_data_offset: u64,
    actl: Option<ActlChunk>,
    next_sequence: u32,
    frames: Vec<FrameDescriptor>,
    fell_back: bool,
    truncated: bool,
}

impl<'a, R: Read + Seek> ChunkScanner<'a, R> {
    pub fn new(reader: &'a mut ByteReader<R>, rule: &'a dyn FrameDependencyRule) -> ApngResult<Self> {
        let stream_len = reader.stream_len()?;

        Ok(ChunkScanner {
            reader,
            rule,
            stream_len,
            ihdr: None,
            ihdr_offset: None,
            has_transparency: false,
            canvas: None,
            header: None,
            base_data_offset: 0,
            actl: None,
            next_sequence: 0,
            frames: Vec::new(),
            fell_back: false,
            truncated: false,
        })
    }

    pub fn scan(mut self) -> ApngResult<FrameStore> {
        self.reader.seek_to(0)?;

        let mut signature = [0u8; 8];
        if self.reader.read_up_to(&mut signature)? < signature.len() || signature != PNG_SIGNATURE {
            return Err(ApngError::InvalidSignature);
        }

        let mut position = self.reader.position()?;

        loop {
            let mut prefix_bytes = [0u8; CHUNK_PREFIX_LEN];
            let read = self.reader.read_up_to(&mut prefix_bytes)?;

            if read == 0 {
                log_debug!("Stream ended without IEND at offset {}", position);
                break;
            }

            if read < CHUNK_PREFIX_LEN {
                log_warn!("Truncated chunk prefix at offset {}", position);
                self.truncated = true;
                break;
            }

            let prefix = ChunkPrefix::parse(&prefix_bytes);

            if self.visit(prefix, position)? == Flow::Stop {
                break;
            }

            let chunk_end = position + prefix.total_len();
            if chunk_end > self.stream_len {
                log_warn!("Truncated {:?} chunk at offset {}", prefix.chunk, position);
                self.truncated = true;
                break;
            }

            position = chunk_end;
            self.reader.seek_to(position)?;
        }

        self.finish()
    }

    fn visit(&mut self, prefix: ChunkPrefix, position: u64) -> ApngResult<Flow> {
        let payload_offset = position + CHUNK_PREFIX_LEN as u64;

        match prefix.chunk {
            PngChunk::IHDR => self.read_ihdr(prefix, payload_offset),
            PngChunk::TRNS => {
                if self.header.is_none() {
                    self.has_transparency = true;
                }
                Ok(Flow::Continue)
            }
            PngChunk::IDAT => self.read_idat(position),
            PngChunk::ACTL => self.read_actl(prefix, payload_offset),
            PngChunk::FCTL => self.read_fctl(prefix, payload_offset),
            PngChunk::FDAT => self.read_fdat(prefix, payload_offset),
            PngChunk::IEND => Ok(Flow::Stop),
            _ => Ok(Flow::Continue),
        }
    }

    fn read_ihdr(&mut self, prefix: ChunkPrefix, payload_offset: u64) -> ApngResult<Flow> {
        if self.ihdr.is_some() {
            log_warn!("Ignoring duplicate IHDR chunk");
            return Ok(Flow::Continue);
        }

        if prefix.length as usize != IHDR_LEN {
            return Err(ApngError::CorruptData(format!("IHDR length {} != {}", prefix.length, IHDR_LEN)));
        }

        let Some(data) = self.read_payload(payload_offset, IHDR_LEN)? else {
            return Ok(Flow::Stop);
        };

        self.ihdr = Some(ImageHeader::parse(&data)?);
        self.ihdr_offset = Some(payload_offset);

        Ok(Flow::Continue)
    }

    fn read_idat(&mut self, position: u64) -> ApngResult<Flow> {
        if self.header.is_some() {
            return Ok(Flow::Continue);
        }

        let ihdr_offset = self
            .ihdr_offset
            .ok_or_else(|| ApngError::CorruptData("IDAT before IHDR".to_string()))?;

        let bytes = self.reader.read_span(0, position as usize)?;
        self.header = Some(AnimationHeader::new(bytes, ihdr_offset as usize)?);
        self.base_data_offset = position;

        if self.actl.is_none() && !self.fell_back {
            log_debug!("No acTL before the first IDAT; decoding as a still image");
            self.fell_back = true;
        }

        Ok(self.after_header())
    }

    fn read_actl(&mut self, prefix: ChunkPrefix, payload_offset: u64) -> ApngResult<Flow> {
        if self.fell_back {
            return Ok(self.after_header());
        }

        if self.header.is_some() {
            log_warn!("Ignoring acTL chunk after image data");
            return Ok(Flow::Continue);
        }

        if self.actl.is_some() {
            log_warn!("Ignoring duplicate acTL chunk");
            return Ok(Flow::Continue);
        }

        if prefix.length != ACTL_LEN {
            return Ok(self.fall_back(&format!("acTL length {} != {}", prefix.length, ACTL_LEN)));
        }

        let Some(data) = self.read_payload(payload_offset, ACTL_LEN as usize)? else {
            return Ok(Flow::Stop);
        };

        let actl = ActlChunk {
            num_frames: read_u32_be(&data, 0).unwrap_or(0),
            num_plays: read_u32_be(&data, 4).unwrap_or(0),
        };

        if actl.num_frames == 0 {
            return Ok(self.fall_back("acTL chunk with zero frames"));
        }

        if actl.num_frames > PNG_UINT_31_MAX || actl.num_plays > PNG_UINT_31_MAX {
            return Ok(self.fall_back(&format!(
                "acTL values out of range: frames={}, plays={}",
                actl.num_frames, actl.num_plays
            )));
        }

        self.actl = Some(actl);
        Ok(Flow::Continue)
    }

    fn read_fctl(&mut self, prefix: ChunkPrefix, payload_offset: u64) -> ApngResult<Flow> {
        if self.fell_back {
            return Ok(self.after_header());
        }

        if prefix.length != FCTL_LEN {
            return Ok(self.fall_back(&format!("fcTL length {} != {}", prefix.length, FCTL_LEN)));
        }

        let Some(data) = self.read_payload(payload_offset, FCTL_LEN as usize)? else {
            return Ok(Flow::Stop);
        };

        let Some(fctl) = FctlChunk::parse(&data) else {
            return Ok(self.fall_back("unreadable fcTL chunk"));
        };

        if !self.check_sequence(fctl.sequence_number) {
            return Ok(self.fall_back(&format!(
                "fcTL sequence number {} where {} was expected",
                fctl.sequence_number, self.next_sequence
            )));
        }

        let Some(ihdr) = self.ihdr else {
            return Ok(self.fall_back("fcTL chunk before IHDR"));
        };

        let uses_base_image = self.header.is_none();
        if uses_base_image && !self.frames.is_empty() {
            return Ok(self.fall_back("more than one fcTL before the first IDAT"));
        }

        let rect = fctl.rect();
        if uses_base_image && rect != FrameRect::canvas(ihdr.width, ihdr.height) {
            return Ok(self.fall_back(&format!(
                "default image fcTL {}x{}+{}+{} does not match the {}x{} IHDR",
                rect.width, rect.height, rect.x, rect.y, ihdr.width, ihdr.height
            )));
        }

        // The first fcTL fixes the canvas; its offsets must be zero.
        let canvas = self.canvas.unwrap_or(FrameRect::canvas(rect.width, rect.height));
        if !rect.fits_within(canvas.width, canvas.height) {
            return Ok(self.fall_back(&format!(
                "fcTL rect {}x{}+{}+{} outside the {}x{} canvas",
                rect.width, rect.height, rect.x, rect.y, canvas.width, canvas.height
            )));
        }

        if self.canvas.is_none() && canvas != FrameRect::canvas(ihdr.width, ihdr.height) {
            log_debug!(
                "Animation canvas is {}x{}, IHDR is {}x{}",
                canvas.width,
                canvas.height,
                ihdr.width,
                ihdr.height
            );
        }
        self.canvas = Some(canvas);

        if let Some(open) = self.frames.last_mut() {
            open.close();
        }

        let mut frame = FrameDescriptor::new(
            self.frames.len() as u32,
            rect,
            normalize_duration(fctl.delay_num, fctl.delay_den),
            DisposalMethod::from_byte(fctl.dispose_op),
            BlendMode::from_byte(fctl.blend_op),
            uses_base_image,
        );

        let reports_alpha = ihdr.color_type.has_alpha_channel() || self.has_transparency;
        frame.set_has_alpha(reports_alpha || rect != canvas);
        let required = self.rule.required_frame(&frame, &self.frames, canvas, reports_alpha);
        frame.set_required_frame(required);

        self.frames.push(frame);
        Ok(Flow::Continue)
    }

    fn read_fdat(&mut self, prefix: ChunkPrefix, payload_offset: u64) -> ApngResult<Flow> {
        if self.fell_back {
            return Ok(self.after_header());
        }

        if prefix.length < 4 {
            return Ok(self.fall_back(&format!("fdAT length {} is too short", prefix.length)));
        }

        let Some(data) = self.read_payload(payload_offset, 4)? else {
            return Ok(Flow::Stop);
        };

        let sequence_number = read_u32_be(&data, 0).unwrap_or(0);
        if !self.check_sequence(sequence_number) {
            return Ok(self.fall_back(&format!(
                "fdAT sequence number {} where {} was expected",
                sequence_number, self.next_sequence
            )));
        }

        let accepts_data = matches!(self.frames.last(), Some(frame) if !frame.uses_base_image());
        if !accepts_data {
            return Ok(self.fall_back("fdAT chunk without a preceding fcTL chunk"));
        }

        let data_offset = payload_offset + 4;
        let length = prefix.length - 4;
        let available = self.stream_len.saturating_sub(data_offset).min(length as u64) as u32;

        if let Some(frame) = self.frames.last_mut() {
            frame.push_range(DataRange {
                offset: data_offset,
                length: available,
            });
        }

        if available < length {
            log_warn!("fdAT payload truncated: {} of {} bytes", available, length);
            self.truncated = true;
            return Ok(Flow::Stop);
        }

        Ok(Flow::Continue)
    }

    fn read_payload(&mut self, offset: u64, len: usize) -> ApngResult<Option<Vec<u8>>> {
        let data = self.reader.read_span(offset, len)?;

        if data.len() < len {
            log_warn!("Chunk payload truncated at offset {}", offset);
            self.truncated = true;
            return Ok(None);
        }

        Ok(Some(data))
    }

    fn check_sequence(&mut self, sequence_number: u32) -> bool {
        if sequence_number != self.next_sequence {
            return false;
        }

        self.next_sequence += 1;
        true
    }

    fn fall_back(&mut self, reason: &str) -> Flow {
        log_warn!("Invalid animation, decoding as a still image: {}", reason);
        self.fell_back = true;
        self.frames.clear();
        self.canvas = None;
        self.after_header()
    }

    /// Once animation is abandoned, scanning only continues until the base header is captured.
    fn after_header(&self) -> Flow {
        if self.fell_back && self.header.is_some() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn finish(mut self) -> ApngResult<FrameStore> {
        let (Some(header), Some(ihdr)) = (self.header.take(), self.ihdr) else {
            return Err(ApngError::MissingImageData);
        };

        let reports_alpha = ihdr.color_type.has_alpha_channel() || self.has_transparency;
        let mut store = FrameStore::new(
            header,
            ihdr.width,
            ihdr.height,
            ihdr.interlaced,
            reports_alpha,
            self.base_data_offset,
        );

        let actl = match self.actl {
            Some(actl) if !self.fell_back => actl,
            _ => return Ok(store),
        };

        if !self.truncated {
            if let Some(last) = self.frames.last_mut() {
                last.close();
            }
        }

        let discovered = self.frames.len() as u32;
        let frame_count = discovered.min(actl.num_frames);

        if frame_count < 2 {
            log_warn!(
                "Invalid animation, decoding as a still image: {} frame(s) declared, {} found",
                actl.num_frames,
                discovered
            );
            return Ok(store);
        }

        if discovered != actl.num_frames {
            log_warn!("acTL declares {} frames but the stream has {}", actl.num_frames, discovered);
        }

        log_debug!(
            "Indexed {} frames ({} plays, truncated: {})",
            frame_count,
            actl.num_plays,
            self.truncated
        );

        let canvas = self.canvas.unwrap_or(FrameRect::canvas(ihdr.width, ihdr.height));
        store.set_animation(canvas, actl.num_frames, actl.num_plays, self.frames);
        Ok(store)
    }
}
