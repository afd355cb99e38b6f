//! Frame payload transforms
//!
//! Only the transcoding variant touches payload contents; the relay variant
//! forwards them untouched.

pub mod encoder;

pub use encoder::{FrameEncoder, JpegFrameEncoder, PixelFormat};
