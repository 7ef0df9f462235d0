//! Frame splitting for player byte streams.
//!
//! Players talk to the server over a plain TCP stream. [`PlayerFrameCodec`]
//! decides where one message ends and the next begins:
//!
//! * [`FramingMode::Chunk`] treats every read returned by the transport as one
//!   complete message. This relies on clients writing each message in a single
//!   small write, which holds for the intended clients but is not guaranteed by
//!   TCP.
//! * [`FramingMode::Lines`] splits on `\n` and enforces a maximum line length.

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

/// How a player byte stream is split into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// One message per transport read
    #[default]
    Chunk,
    /// One message per newline-terminated line
    Lines,
}

impl std::str::FromStr for FramingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chunk" => Ok(FramingMode::Chunk),
            "lines" => Ok(FramingMode::Lines),
            other => Err(format!(
                "Unknown framing mode '{}', expected 'chunk' or 'lines'",
                other
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame exceeds {max} bytes")]
    FrameTooLong { max: usize },
}

/// Decoder yielding one raw message per frame.
#[derive(Debug)]
pub struct PlayerFrameCodec {
    mode: FramingMode,
    max_length: usize,
    lines: LinesCodec,
}

impl PlayerFrameCodec {
    pub fn new(mode: FramingMode, max_length: usize) -> Self {
        Self {
            mode,
            max_length,
            lines: LinesCodec::new_with_max_length(max_length),
        }
    }

    fn map_lines_error(&self, err: LinesCodecError) -> FrameError {
        match err {
            LinesCodecError::MaxLineLengthExceeded => FrameError::FrameTooLong {
                max: self.max_length,
            },
            LinesCodecError::Io(e) => FrameError::Io(e),
        }
    }
}

impl Decoder for PlayerFrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.mode {
            FramingMode::Chunk => {
                if src.is_empty() {
                    Ok(None)
                } else {
                    let len = src.len();
                    Ok(Some(src.split_to(len)))
                }
            }
            FramingMode::Lines => match self.lines.decode(src) {
                Ok(line) => Ok(line.map(|l| BytesMut::from(l.as_bytes()))),
                Err(e) => Err(self.map_lines_error(e)),
            },
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.mode {
            FramingMode::Chunk => self.decode(src),
            // An unterminated trailing line still counts as a message
            FramingMode::Lines => match self.lines.decode_eof(src) {
                Ok(line) => Ok(line.map(|l| BytesMut::from(l.as_bytes()))),
                Err(e) => Err(self.map_lines_error(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_mode_yields_whole_buffer() {
        let mut codec = PlayerFrameCodec::new(FramingMode::Chunk, 1024);
        let mut buf = BytesMut::from(&b"{\"type\":\"MOVE\"}\n{\"type\":\"MOVE\"}"[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &b"{\"type\":\"MOVE\"}\n{\"type\":\"MOVE\"}"[..]);
        assert!(buf.is_empty());
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_lines_mode_splits_messages() {
        let mut codec = PlayerFrameCodec::new(FramingMode::Lines, 1024);
        let mut buf = BytesMut::from(&b"{\"a\":1}\n{\"b\":2}\n{\"c\""[..]);

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"{\"a\":1}");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"{\"b\":2}");
        // Partial line waits for more input
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b":3}");
        assert_eq!(
            &codec.decode_eof(&mut buf).unwrap().unwrap()[..],
            b"{\"c\":3}"
        );
    }

    #[test]
    fn test_lines_mode_rejects_long_lines() {
        let mut codec = PlayerFrameCodec::new(FramingMode::Lines, 8);
        let mut buf = BytesMut::from(&b"0123456789abcdef\n"[..]);

        match codec.decode(&mut buf) {
            Err(FrameError::FrameTooLong { max }) => assert_eq!(max, 8),
            other => panic!("expected FrameTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_framing_mode_parsing() {
        assert_eq!("chunk".parse::<FramingMode>().unwrap(), FramingMode::Chunk);
        assert_eq!("LINES".parse::<FramingMode>().unwrap(), FramingMode::Lines);
        assert!("length".parse::<FramingMode>().is_err());
    }
}
