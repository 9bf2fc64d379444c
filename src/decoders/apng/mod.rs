//! Animated PNG frame indexing and per-frame decoding.

pub mod dependency;
pub mod frame;
pub mod header;
pub mod scanner;
pub mod session;
pub mod store;
