//! Native messaging frame codec.
//!
//! Browsers talk to native hosts over the host's stdin/stdout. Every
//! message is a 32-bit length in native byte order followed by that many
//! bytes of UTF-8 JSON.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────┐
//! │ len: u32 (ne)│ JSON envelope (len bytes)     │
//! └──────────────┴───────────────────────────────┘
//! ```
//!
//! [`NativeCodec`] wraps [`LengthDelimitedCodec`] for the framing and
//! serde_json for the payload. Use it with [`tokio_util::codec::FramedRead`]
//! and [`tokio_util::codec::FramedWrite`].

// ============================================================================
// Imports
// ============================================================================

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::error::{Error, Result};
use crate::options::DEFAULT_MAX_FRAME_LEN;
use crate::protocol::Message;

// ============================================================================
// Constants
// ============================================================================

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 4;

// ============================================================================
// NativeCodec
// ============================================================================

/// Length-prefixed JSON codec for the native leg.
#[derive(Debug)]
pub struct NativeCodec {
    inner: LengthDelimitedCodec,
}

impl NativeCodec {
    /// Creates a codec rejecting frames above `max_frame_len` bytes.
    #[must_use]
    pub fn new(max_frame_len: usize) -> Self {
        let inner = LengthDelimitedCodec::builder()
            .length_field_length(HEADER_LEN)
            .native_endian()
            .max_frame_length(max_frame_len)
            .new_codec();

        Self { inner }
    }

    /// Creates a codec for the relay → host direction.
    ///
    /// Hosts accept anything that fits the 32-bit prefix.
    #[must_use]
    pub fn outbound() -> Self {
        Self::new(u32::MAX as usize)
    }
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for NativeCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.inner.decode(src)? {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Message> for NativeCodec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let json = serde_json::to_vec(&item)?;
        self.inner.encode(Bytes::from(json), dst)?;
        Ok(())
    }
}

impl Encoder<&Message> for NativeCodec {
    type Error = Error;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<()> {
        let json = serde_json::to_vec(item)?;
        self.inner.encode(Bytes::from(json), dst)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;

    fn frame(json: &str) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32_ne(json.len() as u32);
        buf.put_slice(json.as_bytes());
        buf
    }

    #[test]
    fn test_encode_prefixes_native_endian_length() {
        let mut codec = NativeCodec::default();
        let mut dst = BytesMut::new();
        let message = Message {
            id: Some("3.a".into()),
            command: Some(1),
            ..Message::default()
        };

        codec.encode(&message, &mut dst).expect("encode");

        let len = u32::from_ne_bytes([dst[0], dst[1], dst[2], dst[3]]) as usize;
        assert_eq!(len, dst.len() - HEADER_LEN);
        assert_eq!(&dst[HEADER_LEN..], br#"{"i":"3.a","c":1}"#);
    }

    #[test]
    fn test_decode_waits_for_full_frame() {
        let mut codec = NativeCodec::default();
        let full = frame(r#"{"e":3}"#);
        let mut partial = BytesMut::from(&full[..full.len() - 2]);

        assert!(codec.decode(&mut partial).expect("decode").is_none());

        partial.extend_from_slice(&full[full.len() - 2..]);
        let message = codec.decode(&mut partial).expect("decode").expect("frame");
        assert_eq!(message.event, Some(3));
        assert!(partial.is_empty());
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut codec = NativeCodec::default();
        let mut src = frame(r#"{"i":"1.a"}"#);
        src.extend_from_slice(&frame(r#"{"i":"2.b"}"#));

        let first = codec.decode(&mut src).expect("decode").expect("frame");
        let second = codec.decode(&mut src).expect("decode").expect("frame");
        assert_eq!(first.id.as_deref(), Some("1.a"));
        assert_eq!(second.id.as_deref(), Some("2.b"));
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let mut codec = NativeCodec::new(8);
        let mut src = frame(r#"{"i":"far too long"}"#);
        assert!(matches!(codec.decode(&mut src), Err(Error::Io(_))));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let mut codec = NativeCodec::default();
        let mut src = frame("not json");
        assert!(matches!(codec.decode(&mut src), Err(Error::Json(_))));
    }
}
