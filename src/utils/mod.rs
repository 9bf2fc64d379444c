pub mod error;
pub mod logger;
pub mod reader;
pub(crate) mod traits;
pub mod writer;
