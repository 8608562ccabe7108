//! Mail parsing — header/address extraction, MIME body walking, and
//! normalization of provider messages into canonical records.

pub mod headers;
pub mod mime;
pub mod normalize;

pub use normalize::NormalizedMessage;
