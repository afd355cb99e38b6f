//! Ingest protocol constants

/// Two-byte marker at the start of every message in the marked wire format
pub const MARKER: [u8; 2] = [0xED, 0x9E];

/// Upper bound on a declared payload length (10 MiB)
///
/// Not a protocol limit. It bounds memory when a corrupted length field
/// slips through, and doubles as the default resync scan limit.
pub const MAX_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Size of a dimensions payload: two little-endian i32 (width, height)
pub const DIMENSIONS_SIZE: usize = 8;

/// Marker (2) + type (1) + length (4)
pub const MARKED_HEADER_SIZE: usize = 7;

/// Message type tags
pub const MSG_DIMENSIONS: u8 = 1;
pub const MSG_PAYLOAD: u8 = 2;
pub const MSG_CONFIGURATION: u8 = 3;

/// Default TCP ingest port
pub const DEFAULT_INGEST_PORT: u16 = 9999;

/// Default HTTP egress port
pub const DEFAULT_HTTP_PORT: u16 = 8080;
