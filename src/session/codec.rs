use std::io::{Error, ErrorKind};
use std::str;

use bytes::{BufMut, BytesMut};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed};

pub type MessageProtocol = Framed<TcpStream, MessageCodec>;

/// Largest frame a link may carry.
pub const MAX_FRAME_LEN: usize = 65535;

/// Newline-framed text messages: each frame is one complete message, so
/// the link is message-preserving. Frames pass through as raw text; JSON
/// decoding happens in the dispatcher, which lets data packets be
/// forwarded verbatim.
#[derive(Debug, Default)]
pub struct MessageCodec;

impl MessageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for MessageCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Error> {
        if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            let frame = buf.split_to(pos + 1);
            let line = str::from_utf8(&frame[..pos])
                .map_err(|err| Error::new(ErrorKind::InvalidData, err))?;
            Ok(Some(line.to_string()))
        } else if buf.len() > MAX_FRAME_LEN {
            Err(Error::new(
                ErrorKind::InvalidData,
                "Frame exceeds maximum length",
            ))
        } else {
            Ok(None)
        }
    }
}

impl Encoder<String> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, frame: String, buf: &mut BytesMut) -> Result<(), Error> {
        buf.reserve(frame.len() + 1);
        buf.put_slice(frame.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_frame() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"type\":\"dump\"}\n{\"type\""[..]);
        let frame = codec.decode(&mut buf).unwrap();
        assert_eq!(frame, Some("{\"type\":\"dump\"}".to_string()));
        // Remainder stays buffered for the next read
        assert_eq!(&buf[..], b"{\"type\"");
    }

    #[test]
    fn test_decode_incomplete_frame() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&b"{\"type\":\"du"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_oversized_frame() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&vec![b'x'; MAX_FRAME_LEN + 1]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode("{\"type\":\"no route\"}".to_string(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"{\"type\":\"no route\"}\n");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("first".to_string(), &mut buf).unwrap();
        codec.encode("second".to_string(), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("first".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("second".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }
}
