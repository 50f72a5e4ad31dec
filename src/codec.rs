use bytes::{Buf, BytesMut};
use std::io;
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{Frame, TERMINATOR};

/// Upper bound on a buffered, not yet complete, line or response frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Server side of a connection: newline delimited requests in, terminated frames out.
///
/// Used by the application tier towards its clients and by the data tier towards the
/// application tier.
#[derive(Debug)]
pub struct RequestCodec {
    max_frame_size: usize,
    // Index already scanned for a newline, so partial reads are not re-scanned from the start.
    next_index: usize,
}

impl RequestCodec {
    pub fn new() -> RequestCodec {
        RequestCodec::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> RequestCodec {
        RequestCodec {
            max_frame_size,
            next_index: 0,
        }
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

        let Some(offset) = newline else {
            if src.len() > self.max_frame_size {
                return Err(CodecError::FrameTooLarge {
                    limit: self.max_frame_size,
                });
            }
            self.next_index = src.len();
            return Ok(None);
        };

        let end = self.next_index + offset;
        self.next_index = 0;

        let line = src.split_to(end + 1);
        let line = String::from_utf8_lossy(&line[..end])
            .trim_end_matches('\r')
            .to_string();

        Ok(Some(line))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A trailing line without its newline is never dispatched.
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for RequestCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(frame.as_bytes());
        Ok(())
    }
}

/// Client side of a connection: newline terminated requests out, terminated frames in.
///
/// Used by the application tier towards the data tier and by the terminal client.
#[derive(Debug)]
pub struct ResponseCodec {
    max_frame_size: usize,
    next_index: usize,
}

impl ResponseCodec {
    pub fn new() -> ResponseCodec {
        ResponseCodec::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> ResponseCodec {
        ResponseCodec {
            max_frame_size,
            next_index: 0,
        }
    }
}

impl Default for ResponseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ResponseCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let terminator = TERMINATOR.as_bytes();

        // The terminator may straddle two reads, so back up far enough to catch it.
        let start = self.next_index.saturating_sub(terminator.len() - 1);
        let found = src[start..]
            .windows(terminator.len())
            .position(|window| window == terminator);

        let Some(offset) = found else {
            if src.len() > self.max_frame_size {
                return Err(CodecError::FrameTooLarge {
                    limit: self.max_frame_size,
                });
            }
            self.next_index = src.len();
            return Ok(None);
        };

        let end = start + offset + terminator.len();
        self.next_index = 0;

        let text = String::from_utf8_lossy(&src[..end]).to_string();
        src.advance(end);

        Ok(Some(Frame::new(text)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }

        // The peer went away mid-message: hand out what arrived, terminated.
        let text = String::from_utf8_lossy(&src[..]).to_string();
        src.clear();

        Ok(Some(Frame::new(text)))
    }
}

impl Encoder<&str> for ResponseCodec {
    type Error = CodecError;

    fn encode(&mut self, request: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let request = request.trim_end_matches(['\r', '\n']);
        dst.reserve(request.len() + 1);
        dst.extend_from_slice(request.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}
