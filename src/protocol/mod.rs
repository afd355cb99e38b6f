//! Ingest wire protocol
//!
//! Two framings are in use by producers in the field:
//!
//! ```text
//! Marked:  [0xED][0x9E][type:1][size:4 LE][payload:size]
//! Plain:   [type:1][width:4 LE][height:4 LE]            (type 1)
//!          [type:1][size:4 LE][payload:size]            (types 2, 3)
//! ```
//!
//! Only the marked framing can recover from misalignment. Both are read by
//! the same [`FrameDecoder`], selected through [`WireFormat`].

pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod message;

pub use decoder::{DecoderConfig, FrameDecoder, WireFormat};
pub use encoder::encode_message;
pub use message::{Dimensions, Message, MessageType};
