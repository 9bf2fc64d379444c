#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};

pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const ADAM7: [(usize, usize, usize, usize); 7] = [
    // (col start, row start, col delta, row delta)
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

/// Appends chunks to a PNG byte stream, computing lengths and CRCs.
pub struct PngBuilder {
    bytes: Vec<u8>,
    sequence: u32,
}

impl PngBuilder {
    pub fn new() -> Self {
        PngBuilder {
            bytes: SIGNATURE.to_vec(),
            sequence: 0,
        }
    }

    pub fn chunk(mut self, tag: &[u8; 4], data: &[u8]) -> Self {
        let mut crc = Crc::new();
        crc.update(tag);
        crc.update(data);

        self.bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
        self.bytes.extend_from_slice(tag);
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(&crc.sum().to_be_bytes());
        self
    }

    pub fn ihdr(self, width: u32, height: u32, bit_depth: u8, color_type: u8, interlaced: bool) -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[bit_depth, color_type, 0, 0, interlaced as u8]);
        self.chunk(b"IHDR", &data)
    }

    pub fn actl(self, num_frames: u32, num_plays: u32) -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(&num_frames.to_be_bytes());
        data.extend_from_slice(&num_plays.to_be_bytes());
        self.chunk(b"acTL", &data)
    }

    /// fcTL using the next sequence number.
    pub fn fctl(mut self, rect: (u32, u32, u32, u32), delay: (u16, u16), dispose: u8, blend: u8) -> Self {
        let sequence = self.next_sequence();
        self.fctl_with_sequence(sequence, rect, delay, dispose, blend)
    }

    pub fn fctl_with_sequence(
        self,
        sequence: u32,
        (x, y, width, height): (u32, u32, u32, u32),
        (delay_num, delay_den): (u16, u16),
        dispose: u8,
        blend: u8,
    ) -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(&sequence.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&x.to_be_bytes());
        data.extend_from_slice(&y.to_be_bytes());
        data.extend_from_slice(&delay_num.to_be_bytes());
        data.extend_from_slice(&delay_den.to_be_bytes());
        data.extend_from_slice(&[dispose, blend]);
        self.chunk(b"fcTL", &data)
    }

    /// Splits `zdata` across `pieces` IDAT chunks.
    pub fn idat(mut self, zdata: &[u8], pieces: usize) -> Self {
        for piece in split(zdata, pieces) {
            self = self.chunk(b"IDAT", piece);
        }
        self
    }

    /// Splits `zdata` across `pieces` fdAT chunks using consecutive sequence numbers.
    pub fn fdat(mut self, zdata: &[u8], pieces: usize) -> Self {
        for piece in split(zdata, pieces) {
            let sequence = self.next_sequence();
            self = self.fdat_with_sequence(sequence, piece);
        }
        self
    }

    pub fn fdat_with_sequence(self, sequence: u32, data: &[u8]) -> Self {
        let mut payload = sequence.to_be_bytes().to_vec();
        payload.extend_from_slice(data);
        self.chunk(b"fdAT", &payload)
    }

    pub fn iend(self) -> Self {
        self.chunk(b"IEND", &[])
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    fn next_sequence(&mut self) -> u32 {
        let sequence = self.sequence;
        self.sequence += 1;
        sequence
    }
}

fn split(data: &[u8], pieces: usize) -> Vec<&[u8]> {
    let size = ((data.len() + pieces - 1) / pieces.max(1)).max(1);
    data.chunks(size).collect()
}

pub fn zlib(raw: &[u8], level: Compression) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(raw).expect("in-memory write");
    encoder.finish().expect("in-memory finish")
}

/// Filter-type-0 scanlines for packed rows of `row_len` bytes.
pub fn scanlines(packed: &[u8], row_len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for row in packed.chunks(row_len) {
        out.push(0);
        out.extend_from_slice(row);
    }
    out
}

/// Adam7 scanlines for an image with whole-byte pixels.
pub fn interlaced_scanlines(pixels: &[u8], width: usize, height: usize, bytes_per_pixel: usize) -> Vec<u8> {
    let mut out = Vec::new();

    for &(col_start, row_start, col_delta, row_delta) in ADAM7.iter() {
        if col_start >= width || row_start >= height {
            continue;
        }

        for y in (row_start..height).step_by(row_delta) {
            // Sub filter on odd rows to exercise unfiltering across passes.
            let filter = (y % 2) as u8;
            out.push(filter);

            let mut previous = vec![0u8; bytes_per_pixel];
            for x in (col_start..width).step_by(col_delta) {
                let start = (y * width + x) * bytes_per_pixel;
                let pixel = &pixels[start..start + bytes_per_pixel];
                for (i, &value) in pixel.iter().enumerate() {
                    out.push(if filter == 1 { value.wrapping_sub(previous[i]) } else { value });
                }
                previous.copy_from_slice(pixel);
            }
        }
    }

    out
}

/// RGBA8 stream data (filtered, not compressed) for either layout.
pub fn rgba_image_data(pixels: &[u8], width: u32, height: u32, interlaced: bool) -> Vec<u8> {
    if interlaced {
        interlaced_scanlines(pixels, width as usize, height as usize, 4)
    } else {
        scanlines(pixels, width as usize * 4)
    }
}

pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    rgba.iter().copied().cycle().take((width * height * 4) as usize).collect()
}

/// Distinct, position-dependent RGBA8 content.
pub fn pattern(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x as u8).wrapping_mul(3).wrapping_add(seed));
            pixels.push((y as u8).wrapping_mul(5).wrapping_add(seed));
            pixels.push(((x + y) as u8) ^ seed);
            pixels.push(128u8.wrapping_add(seed).wrapping_add(x as u8));
        }
    }
    pixels
}

pub struct TestFrame {
    pub rect: (u32, u32, u32, u32),
    pub delay: (u16, u16),
    pub dispose: u8,
    pub blend: u8,
    pub pixels: Vec<u8>,
}

impl TestFrame {
    pub fn new(rect: (u32, u32, u32, u32), delay: (u16, u16), dispose: u8, blend: u8, seed: u8) -> Self {
        TestFrame {
            rect,
            delay,
            dispose,
            blend,
            pixels: pattern(rect.2, rect.3, seed),
        }
    }
}

pub struct ApngFixture {
    pub bytes: Vec<u8>,
    /// fdAT payload bytes per frame, sequence numbers excluded.
    pub frame_data_len: Vec<u64>,
}

/// RGBA8 APNG whose first frame is the default image. Frame data is split into `pieces` chunks.
pub fn build_apng(
    width: u32,
    height: u32,
    frames: &[TestFrame],
    interlaced: bool,
    plays: u32,
    pieces: usize,
    level: Compression,
) -> ApngFixture {
    build_apng_declaring(width, height, frames, frames.len() as u32, interlaced, plays, pieces, level)
}

/// Like [`build_apng`], with the acTL frame count set independently of `frames`.
pub fn build_apng_declaring(
    width: u32,
    height: u32,
    frames: &[TestFrame],
    declared: u32,
    interlaced: bool,
    plays: u32,
    pieces: usize,
    level: Compression,
) -> ApngFixture {
    let mut builder = PngBuilder::new()
        .ihdr(width, height, 8, 6, interlaced)
        .actl(declared, plays);
    let mut frame_data_len = Vec::new();

    for (i, frame) in frames.iter().enumerate() {
        let zdata = zlib(
            &rgba_image_data(&frame.pixels, frame.rect.2, frame.rect.3, interlaced),
            level,
        );

        builder = builder.fctl(frame.rect, frame.delay, frame.dispose, frame.blend);
        if i == 0 {
            builder = builder.idat(&zdata, pieces);
            frame_data_len.push(0);
        } else {
            builder = builder.fdat(&zdata, pieces);
            frame_data_len.push(zdata.len() as u64);
        }
    }

    ApngFixture {
        bytes: builder.iend().build(),
        frame_data_len,
    }
}

/// Plain RGBA8 PNG.
pub fn build_png(width: u32, height: u32, pixels: &[u8], interlaced: bool) -> Vec<u8> {
    let zdata = zlib(&rgba_image_data(pixels, width, height, interlaced), Compression::default());
    PngBuilder::new()
        .ihdr(width, height, 8, 6, interlaced)
        .idat(&zdata, 3)
        .iend()
        .build()
}

/// Canvas of `height` rows of `row_bytes` with `frame` pasted at its rect over zeros.
pub fn placed(height: u32, frame: &TestFrame, row_bytes: usize) -> Vec<u8> {
    let mut canvas = vec![0u8; row_bytes * height as usize];
    let (x, y, w, h) = frame.rect;
    for row in 0..h as usize {
        let src = &frame.pixels[row * w as usize * 4..(row + 1) * w as usize * 4];
        let start = (y as usize + row) * row_bytes + x as usize * 4;
        canvas[start..start + w as usize * 4].copy_from_slice(src);
    }
    canvas
}

/// The three-frame 100x100 animation used across tests.
pub fn three_frames() -> Vec<TestFrame> {
    vec![
        TestFrame::new((0, 0, 100, 100), (0, 1), 0, 0, 1),
        TestFrame::new((10, 10, 50, 50), (1, 10), 1, 1, 77),
        TestFrame::new((0, 0, 100, 100), (20, 0), 0, 0, 150),
    ]
}
