//! Progressive single-image PNG engine driven by the APNG frame decoder.

pub mod chunk;
pub mod engine;
pub mod filter;
pub mod header;
pub mod interlace;
pub mod transform;
