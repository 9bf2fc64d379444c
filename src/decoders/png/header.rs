use crate::decoders::png::chunk::{read_u16_be, read_u32_be, IHDR_LEN, PNG_UINT_31_MAX};
use crate::decoders::png::interlace::ADAM7_PASSES;
use crate::log_warn;
use crate::utils::error::{ApngError, ApngResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Grayscale = 0,
    RGB = 2,
    Indexed = 3,
    GrayscaleAlpha = 4,
    RGBA = 6,
}

impl ColorType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::RGB),
            3 => Some(ColorType::Indexed),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::RGBA),
            _ => None,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            ColorType::Grayscale | ColorType::Indexed => 1,
            ColorType::GrayscaleAlpha => 2,
            ColorType::RGB => 3,
            ColorType::RGBA => 4,
        }
    }

    pub fn has_alpha_channel(&self) -> bool {
        matches!(self, ColorType::GrayscaleAlpha | ColorType::RGBA)
    }

    fn allows_bit_depth(&self, bit_depth: u8) -> bool {
        match self {
            ColorType::Grayscale => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
            ColorType::Indexed => matches!(bit_depth, 1 | 2 | 4 | 8),
            ColorType::RGB | ColorType::GrayscaleAlpha | ColorType::RGBA => matches!(bit_depth, 8 | 16),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransparencyData {
    Grayscale(u16),
    RGB(u16, u16, u16),
    Palette(Vec<u8>),
}

/// Decoded IHDR fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlaced: bool,
}

impl ImageHeader {
    pub fn parse(data: &[u8]) -> ApngResult<Self> {
        if data.len() != IHDR_LEN {
            return Err(ApngError::CorruptData(format!("IHDR length {} != {}", data.len(), IHDR_LEN)));
        }

        let width = read_u32_be(data, 0).unwrap_or(0);
        let height = read_u32_be(data, 4).unwrap_or(0);
        let bit_depth = data[8];
        let color_type = data[9];
        let compression_method = data[10];
        let filter_method = data[11];
        let interlace_method = data[12];

        if width == 0 || height == 0 || width > PNG_UINT_31_MAX || height > PNG_UINT_31_MAX {
            return Err(ApngError::InvalidDimensions { width, height });
        }

        let color_type = ColorType::from_byte(color_type)
            .ok_or_else(|| ApngError::CorruptData(format!("Invalid color type: {}", color_type)))?;

        if !color_type.allows_bit_depth(bit_depth) {
            return Err(ApngError::CorruptData(format!(
                "Invalid bit depth {} for color type {:?}",
                bit_depth, color_type
            )));
        }

        if compression_method != 0 {
            log_warn!("Invalid compression method: {}", compression_method);
        }

        if filter_method != 0 {
            log_warn!("Invalid filter method: {}", filter_method);
        }

        let interlaced = match interlace_method {
            0 => false,
            1 => true,
            n => {
                log_warn!("Invalid interlace method: {}, assuming none", n);
                false
            }
        };

        Ok(ImageHeader {
            width,
            height,
            bit_depth,
            color_type,
            interlaced,
        })
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.color_type.channels() * self.bit_depth as usize
    }

    /// Filter unit: bytes per complete pixel, rounded up to one.
    pub fn filter_bytes_per_pixel(&self) -> usize {
        ((self.bits_per_pixel() + 7) / 8).max(1)
    }

    /// Packed bytes in one row of `width` pixels, without the filter byte.
    pub fn packed_row_bytes(&self, width: usize) -> usize {
        (width * self.bits_per_pixel() + 7) / 8
    }

    /// Packed bytes in a full-width image row.
    pub fn row_bytes(&self) -> usize {
        self.packed_row_bytes(self.width as usize)
    }

    pub fn passes(&self) -> u8 {
        if self.interlaced {
            ADAM7_PASSES
        } else {
            1
        }
    }
}

/// Parses a tRNS payload for the given color type. Malformed payloads are ignored with a warning.
pub fn parse_transparency(data: &[u8], color_type: ColorType, palette_len: Option<usize>) -> Option<TransparencyData> {
    match color_type {
        ColorType::Grayscale => match read_u16_be(data, 0) {
            Some(gray) if data.len() == 2 => Some(TransparencyData::Grayscale(gray)),
            _ => {
                log_warn!("Invalid tRNS length for grayscale");
                None
            }
        },
        ColorType::RGB => match (read_u16_be(data, 0), read_u16_be(data, 2), read_u16_be(data, 4)) {
            (Some(r), Some(g), Some(b)) if data.len() == 6 => Some(TransparencyData::RGB(r, g, b)),
            _ => {
                log_warn!("Invalid tRNS length for RGB");
                None
            }
        },
        ColorType::Indexed => match palette_len {
            Some(len) => {
                if data.len() > len {
                    log_warn!("tRNS has {} entries for a palette of {}", data.len(), len);
                }
                Some(TransparencyData::Palette(data.to_vec()))
            }
            None => {
                log_warn!("tRNS chunk before PLTE chunk");
                None
            }
        },
        _ => {
            log_warn!("tRNS chunk not allowed for color type {:?}", color_type);
            None
        }
    }
}
