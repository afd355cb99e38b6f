//! Ingest message encoder
//!
//! Producer side of the wire protocol. Used by [`crate::client::Publisher`].

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};

use super::constants::{DIMENSIONS_SIZE, MARKED_HEADER_SIZE, MARKER, MAX_PAYLOAD_SIZE};
use super::decoder::WireFormat;
use super::message::Message;

/// Append one message to `buf` in the given wire format
///
/// Payloads over the server's 10 MiB limit are refused here rather than
/// having the server drop the connection.
pub fn encode_message(msg: &Message, format: WireFormat, buf: &mut BytesMut) -> Result<()> {
    let len = msg.payload_len();
    if len > MAX_PAYLOAD_SIZE {
        return Err(Error::InvalidMessage(format!(
            "payload of {} bytes exceeds maximum {}",
            len, MAX_PAYLOAD_SIZE
        )));
    }

    let tag = msg.message_type().as_u8();

    match format {
        WireFormat::Marked => {
            buf.reserve(MARKED_HEADER_SIZE + len);
            buf.put_slice(&MARKER);
            buf.put_u8(tag);
            buf.put_u32_le(len as u32);
        }
        WireFormat::Plain => {
            buf.reserve(5 + len);
            buf.put_u8(tag);
            if !matches!(msg, Message::Dimensions(_)) {
                buf.put_u32_le(len as u32);
            }
        }
    }

    match msg {
        Message::Dimensions(dims) => {
            buf.put_i32_le(dims.width);
            buf.put_i32_le(dims.height);
            debug_assert_eq!(len, DIMENSIONS_SIZE);
        }
        Message::Configuration(data) | Message::Payload(data) => buf.put_slice(data),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::message::Dimensions;

    #[test]
    fn test_marked_payload_layout() {
        let mut buf = BytesMut::new();
        encode_message(
            &Message::Payload(Bytes::from_static(b"AAAAA")),
            WireFormat::Marked,
            &mut buf,
        )
        .unwrap();

        assert_eq!(
            &buf[..],
            &[0xED, 0x9E, 0x02, 0x05, 0x00, 0x00, 0x00, b'A', b'A', b'A', b'A', b'A']
        );
    }

    #[test]
    fn test_marked_dimensions_layout() {
        let mut buf = BytesMut::new();
        encode_message(
            &Message::Dimensions(Dimensions::new(640, 480)),
            WireFormat::Marked,
            &mut buf,
        )
        .unwrap();

        assert_eq!(&buf[..7], &[0xED, 0x9E, 0x01, 0x08, 0x00, 0x00, 0x00]);
        assert_eq!(&buf[7..11], &640i32.to_le_bytes());
        assert_eq!(&buf[11..], &480i32.to_le_bytes());
    }

    #[test]
    fn test_plain_dimensions_have_no_length() {
        let mut buf = BytesMut::new();
        encode_message(
            &Message::Dimensions(Dimensions::new(2, 3)),
            WireFormat::Plain,
            &mut buf,
        )
        .unwrap();

        assert_eq!(&buf[..], &[0x01, 2, 0, 0, 0, 3, 0, 0, 0]);
    }

    #[test]
    fn test_plain_configuration_layout() {
        let mut buf = BytesMut::new();
        encode_message(
            &Message::Configuration(Bytes::from_static(&[0x67, 0x68])),
            WireFormat::Plain,
            &mut buf,
        )
        .unwrap();

        assert_eq!(&buf[..], &[0x03, 0x02, 0x00, 0x00, 0x00, 0x67, 0x68]);
    }

    #[test]
    fn test_oversized_payload_refused() {
        let mut buf = BytesMut::new();
        let msg = Message::Payload(Bytes::from(vec![0u8; MAX_PAYLOAD_SIZE + 1]));

        let result = encode_message(&msg, WireFormat::Marked, &mut buf);
        assert!(matches!(result, Err(Error::InvalidMessage(_))));
        assert!(buf.is_empty());
    }
}
