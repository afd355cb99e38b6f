//! Decoded ingest messages

use bytes::Bytes;

use super::constants::{DIMENSIONS_SIZE, MSG_CONFIGURATION, MSG_DIMENSIONS, MSG_PAYLOAD};

/// Message type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Frame geometry (type 1)
    Dimensions,
    /// Encoded or raw frame data (type 2)
    Payload,
    /// Decoder configuration, e.g. H.264 SPS/PPS (type 3)
    Configuration,
}

impl MessageType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            MSG_DIMENSIONS => Some(MessageType::Dimensions),
            MSG_PAYLOAD => Some(MessageType::Payload),
            MSG_CONFIGURATION => Some(MessageType::Configuration),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            MessageType::Dimensions => MSG_DIMENSIONS,
            MessageType::Payload => MSG_PAYLOAD,
            MessageType::Configuration => MSG_CONFIGURATION,
        }
    }
}

/// Frame geometry announced by the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: i32,
    pub height: i32,
}

impl Dimensions {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Parse from the 8-byte wire payload
    pub fn from_le_bytes(raw: [u8; DIMENSIONS_SIZE]) -> Self {
        Self {
            width: i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            height: i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
        }
    }

    /// Pixel count, or None for non-positive geometry
    pub fn pixel_count(&self) -> Option<usize> {
        if self.width <= 0 || self.height <= 0 {
            return None;
        }
        (self.width as usize).checked_mul(self.height as usize)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A complete message read from the ingest socket
///
/// Payloads are `Bytes` so that one allocation is shared by every consumer
/// queue it is published to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Dimensions(Dimensions),
    Configuration(Bytes),
    Payload(Bytes),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Dimensions(_) => MessageType::Dimensions,
            Message::Configuration(_) => MessageType::Configuration,
            Message::Payload(_) => MessageType::Payload,
        }
    }

    /// Payload length as carried on the wire
    pub fn payload_len(&self) -> usize {
        match self {
            Message::Dimensions(_) => DIMENSIONS_SIZE,
            Message::Configuration(data) | Message::Payload(data) => data.len(),
        }
    }

    /// Zero-length configuration or payload messages carry nothing to act on
    pub fn is_empty(&self) -> bool {
        match self {
            Message::Dimensions(_) => false,
            Message::Configuration(data) | Message::Payload(data) => data.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_tags() {
        assert_eq!(MessageType::from_u8(1), Some(MessageType::Dimensions));
        assert_eq!(MessageType::from_u8(2), Some(MessageType::Payload));
        assert_eq!(MessageType::from_u8(3), Some(MessageType::Configuration));
        assert_eq!(MessageType::from_u8(0), None);
        assert_eq!(MessageType::from_u8(4), None);
        assert_eq!(MessageType::Configuration.as_u8(), 3);
    }

    #[test]
    fn test_dimensions_from_le_bytes() {
        let mut raw = [0u8; 8];
        raw[..4].copy_from_slice(&1920i32.to_le_bytes());
        raw[4..].copy_from_slice(&1080i32.to_le_bytes());

        let dims = Dimensions::from_le_bytes(raw);
        assert_eq!(dims, Dimensions::new(1920, 1080));
        assert_eq!(dims.pixel_count(), Some(1920 * 1080));
        assert_eq!(dims.to_string(), "1920x1080");
    }

    #[test]
    fn test_negative_dimensions_have_no_pixels() {
        assert_eq!(Dimensions::new(-1, 10).pixel_count(), None);
        assert_eq!(Dimensions::new(10, 0).pixel_count(), None);
    }

    #[test]
    fn test_empty_messages() {
        assert!(Message::Payload(Bytes::new()).is_empty());
        assert!(Message::Configuration(Bytes::new()).is_empty());
        assert!(!Message::Dimensions(Dimensions::new(0, 0)).is_empty());
        assert_eq!(Message::Dimensions(Dimensions::new(1, 1)).payload_len(), 8);
    }
}
