use flate2::Crc;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const CHUNK_PREFIX_LEN: usize = 8;
pub const CHUNK_CRC_LEN: usize = 4;

/// Largest value allowed in PNG 31-bit unsigned fields.
pub const PNG_UINT_31_MAX: u32 = 0x7fff_ffff;

pub const IHDR_LEN: usize = 13;
pub const ACTL_LEN: u32 = 8;
pub const FCTL_LEN: u32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngChunk {
    // Critical chunks
    IHDR,  // Image header
    PLTE,  // Palette
    IDAT,  // Image data
    IEND,  // End of image

    // Ancillary chunks
    TRNS,  // Transparency

    // Animation chunks
    ACTL,  // Animation control
    FCTL,  // Frame control
    FDAT,  // Frame data

    Other([u8; 4]),
}

impl PngChunk {
    pub fn from_tag(tag: &[u8; 4]) -> Self {
        match tag {
            b"IHDR" => PngChunk::IHDR,
            b"PLTE" => PngChunk::PLTE,
            b"IDAT" => PngChunk::IDAT,
            b"IEND" => PngChunk::IEND,
            b"tRNS" => PngChunk::TRNS,
            b"acTL" => PngChunk::ACTL,
            b"fcTL" => PngChunk::FCTL,
            b"fdAT" => PngChunk::FDAT,
            other => PngChunk::Other(*other),
        }
    }

    pub fn tag(&self) -> [u8; 4] {
        match self {
            PngChunk::IHDR => *b"IHDR",
            PngChunk::PLTE => *b"PLTE",
            PngChunk::IDAT => *b"IDAT",
            PngChunk::IEND => *b"IEND",
            PngChunk::TRNS => *b"tRNS",
            PngChunk::ACTL => *b"acTL",
            PngChunk::FCTL => *b"fcTL",
            PngChunk::FDAT => *b"fdAT",
            PngChunk::Other(tag) => *tag,
        }
    }

    /// Critical chunks have an uppercase first letter (bit 5 clear).
    pub fn is_critical(&self) -> bool {
        self.tag()[0] & 0x20 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPrefix {
    pub length: u32,
    pub chunk: PngChunk,
}

impl ChunkPrefix {
    pub fn new(length: u32, chunk: PngChunk) -> Self {
        ChunkPrefix { length, chunk }
    }

    pub fn parse(bytes: &[u8; CHUNK_PREFIX_LEN]) -> Self {
        let length = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let tag = [bytes[4], bytes[5], bytes[6], bytes[7]];

        ChunkPrefix {
            length,
            chunk: PngChunk::from_tag(&tag),
        }
    }

    pub fn to_bytes(&self) -> [u8; CHUNK_PREFIX_LEN] {
        let mut bytes = [0u8; CHUNK_PREFIX_LEN];
        bytes[..4].copy_from_slice(&self.length.to_be_bytes());
        bytes[4..].copy_from_slice(&self.chunk.tag());
        bytes
    }

    /// Bytes from the start of the prefix to the end of the CRC.
    pub fn total_len(&self) -> u64 {
        (CHUNK_PREFIX_LEN + CHUNK_CRC_LEN) as u64 + self.length as u64
    }
}

/// CRC over the chunk type and payload, as stored in the chunk trailer.
pub fn chunk_crc(tag: &[u8; 4], payload: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(tag);
    crc.update(payload);
    crc.sum()
}

pub fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}
