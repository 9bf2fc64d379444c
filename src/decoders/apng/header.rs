use crate::decoders::png::chunk::{chunk_crc, CHUNK_PREFIX_LEN, IHDR_LEN};
use crate::utils::error::{ApngError, ApngResult};
use crate::utils::traits::SafeAccess;

/// Stream bytes from the signature up to the first IDAT prefix.
///
/// Replaying a frame feeds these bytes first, with the IHDR size replaced by the frame's own, so
/// the engine sees an ordinary PNG whose image is exactly the frame rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationHeader {
    bytes: Vec<u8>,
    ihdr_offset: usize,
}

impl AnimationHeader {
    /// `ihdr_offset` is the position of the IHDR payload within `bytes`.
    pub fn new(bytes: Vec<u8>, ihdr_offset: usize) -> ApngResult<Self> {
        bytes.check_range(ihdr_offset.saturating_sub(CHUNK_PREFIX_LEN)..ihdr_offset + IHDR_LEN + 4)?;

        if ihdr_offset < CHUNK_PREFIX_LEN || &bytes[ihdr_offset - 4..ihdr_offset] != b"IHDR" {
            return Err(ApngError::CorruptData(format!("no IHDR payload at offset {}", ihdr_offset)));
        }

        Ok(AnimationHeader { bytes, ihdr_offset })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy of the header with IHDR width and height replaced and the IHDR CRC recomputed.
    pub fn patched(&self, width: u32, height: u32) -> ApngResult<Vec<u8>> {
        let mut bytes = self.bytes.clone();
        let start = self.ihdr_offset;

        let ihdr = bytes.get_range_mut_safe(start..start + IHDR_LEN)?;
        ihdr[0..4].copy_from_slice(&width.to_be_bytes());
        ihdr[4..8].copy_from_slice(&height.to_be_bytes());

        let crc = chunk_crc(b"IHDR", bytes.get_range_safe(start..start + IHDR_LEN)?);
        bytes
            .get_range_mut_safe(start + IHDR_LEN..start + IHDR_LEN + 4)?
            .copy_from_slice(&crc.to_be_bytes());

        Ok(bytes)
    }
}
