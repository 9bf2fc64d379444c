use crate::decoders::png::header::{ColorType, ImageHeader, TransparencyData};
use crate::log_warn;

pub const RGBA_BYTES_PER_PIXEL: usize = 4;

/// Converts packed, unfiltered rows of any PNG color type and bit depth to RGBA8.
///
/// 16-bit samples keep their high byte, sub-byte grayscale is scaled to the full 8-bit range,
/// palette entries take their alpha from tRNS, and a tRNS color key becomes alpha 0.
#[derive(Debug, Clone)]
pub struct RowTransform {
    bit_depth: u8,
    color_type: ColorType,
    palette: Vec<[u8; 4]>,
    transparency: Option<TransparencyData>,
}

impl RowTransform {
    pub fn new(header: &ImageHeader, palette: Option<&[[u8; 3]]>, transparency: Option<&TransparencyData>) -> Self {
        let palette_alpha = match transparency {
            Some(TransparencyData::Palette(alpha)) => alpha.as_slice(),
            _ => &[],
        };

        let palette = match palette {
            Some(entries) => entries
                .iter()
                .enumerate()
                .map(|(i, rgb)| [rgb[0], rgb[1], rgb[2], palette_alpha.get(i).copied().unwrap_or(255)])
                .collect(),
            None => {
                if header.color_type == ColorType::Indexed {
                    log_warn!("No palette found for indexed color");
                }
                Vec::new()
            }
        };

        RowTransform {
            bit_depth: header.bit_depth,
            color_type: header.color_type,
            palette,
            transparency: transparency.cloned(),
        }
    }

    /// True when decoded pixels may carry alpha other than 255.
    pub fn has_alpha(&self) -> bool {
        self.color_type.has_alpha_channel() || self.transparency.is_some()
    }

    /// Transforms `width` pixels from `raw` into `out`, which must hold `width * 4` bytes.
    pub fn apply(&self, raw: &[u8], width: usize, out: &mut [u8]) {
        for (x, pixel) in out.chunks_exact_mut(RGBA_BYTES_PER_PIXEL).take(width).enumerate() {
            pixel.copy_from_slice(&self.pixel(raw, x));
        }
    }

    fn pixel(&self, raw: &[u8], x: usize) -> [u8; 4] {
        match self.color_type {
            ColorType::Grayscale => {
                let value = self.sample(raw, x);
                let alpha = match self.transparency {
                    Some(TransparencyData::Grayscale(key)) if key == value => 0,
                    _ => 255,
                };
                let gray = self.scale(value);
                [gray, gray, gray, alpha]
            }
            ColorType::Indexed => {
                let index = self.sample(raw, x) as usize;
                self.palette.get(index).copied().unwrap_or([0, 0, 0, 255])
            }
            ColorType::RGB => {
                let (r, g, b) = (self.sample(raw, x * 3), self.sample(raw, x * 3 + 1), self.sample(raw, x * 3 + 2));
                let alpha = match self.transparency {
                    Some(TransparencyData::RGB(kr, kg, kb)) if (kr, kg, kb) == (r, g, b) => 0,
                    _ => 255,
                };
                [self.scale(r), self.scale(g), self.scale(b), alpha]
            }
            ColorType::GrayscaleAlpha => {
                let gray = self.scale(self.sample(raw, x * 2));
                [gray, gray, gray, self.scale(self.sample(raw, x * 2 + 1))]
            }
            ColorType::RGBA => [
                self.scale(self.sample(raw, x * 4)),
                self.scale(self.sample(raw, x * 4 + 1)),
                self.scale(self.sample(raw, x * 4 + 2)),
                self.scale(self.sample(raw, x * 4 + 3)),
            ],
        }
    }

    /// Reads the `index`th sample of the row at full precision. Missing bytes read as zero.
    fn sample(&self, raw: &[u8], index: usize) -> u16 {
        match self.bit_depth {
            8 => raw.get(index).copied().unwrap_or(0) as u16,
            16 => {
                let hi = raw.get(index * 2).copied().unwrap_or(0);
                let lo = raw.get(index * 2 + 1).copied().unwrap_or(0);
                u16::from_be_bytes([hi, lo])
            }
            depth => {
                let depth = depth as usize;
                let pixels_per_byte = 8 / depth;
                let mask = (1u16 << depth) - 1;
                let byte = raw.get(index / pixels_per_byte).copied().unwrap_or(0) as u16;
                let shift = (pixels_per_byte - 1 - (index % pixels_per_byte)) * depth;
                (byte >> shift) & mask
            }
        }
    }

    fn scale(&self, value: u16) -> u8 {
        match self.bit_depth {
            16 => (value >> 8) as u8,
            8 => value as u8,
            depth => {
                let max_value = (1u16 << depth) - 1;
                (value * 255 / max_value) as u8
            }
        }
    }
}
