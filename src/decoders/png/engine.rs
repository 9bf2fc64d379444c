use flate2::{Crc, Decompress, FlushDecompress, Status};

use crate::decoders::png::chunk::{ChunkPrefix, PngChunk, CHUNK_CRC_LEN, CHUNK_PREFIX_LEN, PNG_SIGNATURE};
use crate::decoders::png::filter::{unfilter_row, FilterType};
use crate::decoders::png::header::{parse_transparency, ImageHeader, TransparencyData};
use crate::decoders::png::interlace::{image_row, pass_dimensions};
use crate::utils::error::{ApngError, ApngResult};
use crate::{log_debug, log_warn};

const INFLATE_BUFFER_SIZE: usize = 16 * 1024;

/// Value returned by a row callback to continue or abandon decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowControl {
    Continue,
    Stop,
}

/// Receives unfiltered rows as the engine produces them.
///
/// `row` holds the packed samples of one row (of the reduced image for interlaced passes),
/// `row_num` is the image row it belongs to and `pass` the Adam7 pass (always 0 when not
/// interlaced).
pub trait RowSink {
    fn on_row(&mut self, row: &[u8], row_num: u32, pass: u8) -> RowControl;
}

/// Sink for feeding header bytes, where no rows can be produced.
pub struct NoRows;

impl RowSink for NoRows {
    fn on_row(&mut self, _row: &[u8], _row_num: u32, _pass: u8) -> RowControl {
        RowControl::Continue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// All input was consumed and more is expected.
    NeedMore,
    /// A row callback returned `RowControl::Stop`; the rest of the input was not processed.
    Stopped,
    /// Every row of the image has been emitted.
    ImageComplete,
    /// The image data ended (IEND, or a non-IDAT chunk after the IDAT run) before all rows.
    DataEnded,
}

#[derive(Debug)]
enum State {
    Signature { seen: usize },
    Prefix { buf: [u8; CHUNK_PREFIX_LEN], filled: usize },
    Payload { prefix: ChunkPrefix, remaining: u32 },
    Crc { prefix: ChunkPrefix, buf: [u8; CHUNK_CRC_LEN], filled: usize },
    Done(FeedStatus),
}

/// Progressive PNG decoder fed with arbitrary slices of a PNG byte stream.
///
/// The engine validates chunk CRCs (a mismatch on a critical chunk is an error, on an ancillary
/// chunk only a warning), parses IHDR, PLTE and tRNS, streams IDAT payloads through zlib and
/// emits each unfiltered row to a [`RowSink`]. Chunks it does not know are skipped.
pub struct PngEngine {
    state: State,
    header: Option<ImageHeader>,
    palette: Option<Vec<[u8; 3]>>,
    transparency: Option<TransparencyData>,
    chunk_data: Vec<u8>,
    crc: Crc,
    inflater: Decompress,
    inflate_buffer: Vec<u8>,
    rows: Option<RowAssembler>,
    seen_idat: bool,
}

impl Default for PngEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PngEngine {
    pub fn new() -> Self {
        PngEngine {
            state: State::Signature { seen: 0 },
            header: None,
            palette: None,
            transparency: None,
            chunk_data: Vec::new(),
            crc: Crc::new(),
            inflater: Decompress::new(true),
            inflate_buffer: vec![0u8; INFLATE_BUFFER_SIZE],
            rows: None,
            seen_idat: false,
        }
    }

    pub fn header(&self) -> Option<&ImageHeader> {
        self.header.as_ref()
    }

    pub fn palette(&self) -> Option<&[[u8; 3]]> {
        self.palette.as_deref()
    }

    pub fn transparency(&self) -> Option<&TransparencyData> {
        self.transparency.as_ref()
    }

    /// Packed bytes in a full image row, once IHDR has been seen.
    pub fn row_bytes(&self) -> Option<usize> {
        self.header.as_ref().map(|h| h.row_bytes())
    }

    /// Feeds the next slice of the stream.
    ///
    /// Returns as soon as the sink asks to stop or the image is finished; bytes after that point
    /// are ignored, as is any input fed once a terminal status has been reported.
    pub fn feed(&mut self, mut input: &[u8], sink: &mut dyn RowSink) -> ApngResult<FeedStatus> {
        while !input.is_empty() {
            match &mut self.state {
                State::Done(status) => return Ok(*status),
                State::Signature { seen } => {
                    let take = (PNG_SIGNATURE.len() - *seen).min(input.len());
                    if input[..take] != PNG_SIGNATURE[*seen..*seen + take] {
                        return Err(ApngError::InvalidSignature);
                    }

                    *seen += take;
                    input = &input[take..];

                    if *seen == PNG_SIGNATURE.len() {
                        self.state = State::Prefix { buf: [0; CHUNK_PREFIX_LEN], filled: 0 };
                    }
                }
                State::Prefix { buf, filled } => {
                    let take = (CHUNK_PREFIX_LEN - *filled).min(input.len());
                    buf[*filled..*filled + take].copy_from_slice(&input[..take]);
                    *filled += take;
                    input = &input[take..];

                    if *filled == CHUNK_PREFIX_LEN {
                        let prefix = ChunkPrefix::parse(buf);
                        if let Some(status) = self.begin_chunk(prefix)? {
                            self.state = State::Done(status);
                            return Ok(status);
                        }
                    }
                }
                State::Payload { prefix, remaining } => {
                    let prefix = *prefix;
                    let take = (*remaining as usize).min(input.len());
                    let (data, rest) = input.split_at(take);
                    *remaining -= take as u32;
                    let payload_done = *remaining == 0;
                    input = rest;

                    self.crc.update(data);

                    if prefix.chunk == PngChunk::IDAT {
                        if let Some(status) = self.inflate(data, sink)? {
                            self.state = State::Done(status);
                            return Ok(status);
                        }
                    } else if self.collects(prefix.chunk) {
                        self.chunk_data.extend_from_slice(data);
                    }

                    if payload_done {
                        self.state = State::Crc { prefix, buf: [0; CHUNK_CRC_LEN], filled: 0 };
                    }
                }
                State::Crc { prefix, buf, filled } => {
                    let take = (CHUNK_CRC_LEN - *filled).min(input.len());
                    buf[*filled..*filled + take].copy_from_slice(&input[..take]);
                    *filled += take;
                    input = &input[take..];

                    if *filled == CHUNK_CRC_LEN {
                        let prefix = *prefix;
                        let stored = u32::from_be_bytes(*buf);
                        self.end_chunk(prefix, stored)?;
                        self.state = State::Prefix { buf: [0; CHUNK_PREFIX_LEN], filled: 0 };
                    }
                }
            }
        }

        Ok(match self.state {
            State::Done(status) => status,
            _ => FeedStatus::NeedMore,
        })
    }

    fn collects(&self, chunk: PngChunk) -> bool {
        matches!(chunk, PngChunk::IHDR | PngChunk::PLTE | PngChunk::TRNS)
    }

    fn begin_chunk(&mut self, prefix: ChunkPrefix) -> ApngResult<Option<FeedStatus>> {
        if self.seen_idat && prefix.chunk != PngChunk::IDAT {
            log_debug!("Image data ended at {:?} chunk", prefix.chunk);
            return Ok(Some(FeedStatus::DataEnded));
        }

        match prefix.chunk {
            PngChunk::IHDR if self.header.is_some() => {
                return Err(ApngError::CorruptData("duplicate IHDR chunk".to_string()));
            }
            PngChunk::IEND => return Ok(Some(FeedStatus::DataEnded)),
            PngChunk::IDAT if !self.seen_idat => {
                let header = self
                    .header
                    .ok_or_else(|| ApngError::CorruptData("IDAT before IHDR".to_string()))?;
                self.rows = Some(RowAssembler::new(header));
                self.seen_idat = true;
            }
            _ => {}
        }

        self.crc.reset();
        self.crc.update(&prefix.chunk.tag());
        self.chunk_data.clear();

        self.state = if prefix.length == 0 {
            State::Crc { prefix, buf: [0; CHUNK_CRC_LEN], filled: 0 }
        } else {
            State::Payload { prefix, remaining: prefix.length }
        };

        Ok(None)
    }

    fn end_chunk(&mut self, prefix: ChunkPrefix, stored: u32) -> ApngResult<()> {
        let computed = self.crc.sum();

        if computed != stored {
            if prefix.chunk.is_critical() {
                return Err(ApngError::CorruptData(format!(
                    "CRC mismatch in {:?} chunk: stored {:08x}, computed {:08x}",
                    prefix.chunk, stored, computed
                )));
            }

            log_warn!(
                "CRC mismatch in ancillary {:?} chunk, ignoring it: stored {:08x}, computed {:08x}",
                prefix.chunk,
                stored,
                computed
            );
            return Ok(());
        }

        match prefix.chunk {
            PngChunk::IHDR => {
                self.header = Some(ImageHeader::parse(&self.chunk_data)?);
            }
            PngChunk::PLTE => {
                if self.chunk_data.len() % 3 != 0 {
                    log_warn!("PLTE chunk length is not a multiple of 3");
                }

                self.palette = Some(self.chunk_data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect());
            }
            PngChunk::TRNS => {
                if let Some(header) = &self.header {
                    let palette_len = self.palette.as_ref().map(|p| p.len());
                    self.transparency = parse_transparency(&self.chunk_data, header.color_type, palette_len);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn inflate(&mut self, mut data: &[u8], sink: &mut dyn RowSink) -> ApngResult<Option<FeedStatus>> {
        loop {
            let in_before = self.inflater.total_in();
            let out_before = self.inflater.total_out();

            let status = self
                .inflater
                .decompress(data, &mut self.inflate_buffer, FlushDecompress::None)?;

            let consumed = (self.inflater.total_in() - in_before) as usize;
            let produced = (self.inflater.total_out() - out_before) as usize;
            data = &data[consumed..];

            if produced > 0 {
                if let Some(rows) = self.rows.as_mut() {
                    if let Some(status) = rows.push(&self.inflate_buffer[..produced], sink) {
                        return Ok(Some(status));
                    }
                }
            }

            match status {
                Status::StreamEnd => {
                    if !data.is_empty() {
                        log_warn!("{} bytes of data after end of zlib stream", data.len());
                    }
                    return Ok(None);
                }
                Status::Ok | Status::BufError => {
                    let output_full = produced == self.inflate_buffer.len();
                    if (data.is_empty() && !output_full) || (consumed == 0 && produced == 0) {
                        return Ok(None);
                    }
                }
            }
        }
    }
}

/// Splits the inflated stream into filtered rows, pass by pass, and unfilters them.
struct RowAssembler {
    header: ImageHeader,
    bytes_per_pixel: usize,
    pass: u8,
    pass_width: usize,
    pass_height: usize,
    row_in_pass: usize,
    current: Vec<u8>,
    filled: usize,
    prior: Vec<u8>,
    finished: bool,
}

impl RowAssembler {
    fn new(header: ImageHeader) -> Self {
        let mut assembler = RowAssembler {
            header,
            bytes_per_pixel: header.filter_bytes_per_pixel(),
            pass: 0,
            pass_width: 0,
            pass_height: 0,
            row_in_pass: 0,
            current: Vec::new(),
            filled: 0,
            prior: Vec::new(),
            finished: false,
        };
        assembler.start_pass(0);
        assembler
    }

    fn start_pass(&mut self, first: u8) {
        let passes = self.header.passes();

        for pass in first..passes {
            let (width, height) = if self.header.interlaced {
                pass_dimensions(pass, self.header.width, self.header.height)
            } else {
                (self.header.width as usize, self.header.height as usize)
            };

            if width == 0 || height == 0 {
                continue;
            }

            let row_len = self.header.packed_row_bytes(width);
            self.pass = pass;
            self.pass_width = width;
            self.pass_height = height;
            self.row_in_pass = 0;
            self.current = vec![0u8; row_len + 1];
            self.prior = vec![0u8; row_len];
            self.filled = 0;
            return;
        }

        self.finished = true;
    }

    fn push(&mut self, mut data: &[u8], sink: &mut dyn RowSink) -> Option<FeedStatus> {
        while !data.is_empty() && !self.finished {
            let take = (self.current.len() - self.filled).min(data.len());
            self.current[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            data = &data[take..];

            if self.filled < self.current.len() {
                break;
            }

            let filter = FilterType::from_byte(self.current[0]);
            unfilter_row(filter, self.bytes_per_pixel, &self.prior, &mut self.current[1..]);
            self.prior.copy_from_slice(&self.current[1..]);
            self.filled = 0;

            let row_num = if self.header.interlaced {
                image_row(self.pass, self.row_in_pass)
            } else {
                self.row_in_pass
            } as u32;

            let control = sink.on_row(&self.prior[..self.header.packed_row_bytes(self.pass_width)], row_num, self.pass);

            self.row_in_pass += 1;
            if self.row_in_pass == self.pass_height {
                self.start_pass(self.pass + 1);
            }

            if control == RowControl::Stop {
                return Some(FeedStatus::Stopped);
            }
        }

        if self.finished {
            Some(FeedStatus::ImageComplete)
        } else {
            None
        }
    }
}
