pub mod apng;
pub mod png;
