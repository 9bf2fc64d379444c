use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::Path;

/// Writes decoded RGBA8 canvases to netpbm files.
pub struct Writer {}

impl Writer {
    /// Writes an RGBA8 canvas as a PAM (`P7`, `RGB_ALPHA`) file.
    pub fn write_pam(output_path: &Path, width: u32, height: u32, pixels: &[u8]) -> Result<(), Error> {
        Writer::validate_pixel_count(width, height, pixels)?;

        let mut file = BufWriter::new(File::create(output_path)?);

        file.write_all(b"P7\n")?;
        file.write_all(format!("WIDTH {}\n", width).as_bytes())?;
        file.write_all(format!("HEIGHT {}\n", height).as_bytes())?;
        file.write_all(b"DEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n")?;
        file.write_all(pixels)?;
        file.flush()?;

        Ok(())
    }

    /// Writes an RGBA8 canvas as a binary PPM (`P6`) file, dropping alpha.
    pub fn write_ppm(output_path: &Path, width: u32, height: u32, pixels: &[u8]) -> Result<(), Error> {
        Writer::validate_pixel_count(width, height, pixels)?;

        let mut file = BufWriter::new(File::create(output_path)?);

        file.write_all(b"P6\n")?;
        file.write_all(format!("{} {}\n", width, height).as_bytes())?;
        file.write_all(b"255\n")?;

        for pixel in pixels.chunks_exact(4) {
            file.write_all(&pixel[..3])?;
        }
        file.flush()?;

        Ok(())
    }

    fn validate_pixel_count(width: u32, height: u32, pixels: &[u8]) -> Result<(), Error> {
        let expected_size = width as usize * height as usize * 4;

        if expected_size != pixels.len() {
            let msg = format!(
                "Invalid pixel data size for {}x{} RGBA image: expected {} bytes, got {}",
                width,
                height,
                expected_size,
                pixels.len()
            );
            return Err(Error::new(ErrorKind::InvalidData, msg));
        }

        Ok(())
    }
}
