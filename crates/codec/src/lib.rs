//! ## Server-Sent Events decoding
//!
//! An event stream is a UTF-8 text stream made of events. Each event is a
//! block of `field: value` lines, and a blank line terminates the block and
//! dispatches the event to the listener. The push server only emits the
//! `data` field, plus comment lines that keep idle connections alive:
//!
//! ```text
//! data: {"hello":"world"}
//!
//! :
//!
//! ```
//!
//! The decoder understands the full field set (`data`, `event`, `id`,
//! comments) so that clients of the server can be built on top of it.

use std::str::Utf8Error;

use bytes::{Buf, BytesMut};

#[derive(Debug)]
pub enum Error {
    Utf8Error(Utf8Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

/// A dispatched event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// Find the end of the first event block in the buffer.
///
/// Returns the length of the block content and the length of the blank line
/// that terminates it.
fn find_boundary(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut offset = 0;
    while let Some(index) = bytes[offset..].iter().position(|b| *b == b'\n') {
        let index = offset + index;
        match bytes.get(index + 1..) {
            Some([b'\n', ..]) => return Some((index, 2)),
            Some([b'\r', b'\n', ..]) => return Some((index, 3)),
            _ => offset = index + 1,
        }
    }

    None
}

/// Turn one event block into an event, `None` if the block carries no data.
fn parse_block(block: &str) -> Option<Event> {
    let mut event = Event::default();
    let mut data = Vec::new();

    for line in block.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        // comment
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => data.push(value),
            "event" => event.event = Some(value.to_string()),
            "id" => event.id = Some(value.to_string()),
            _ => (),
        }
    }

    if data.is_empty() {
        return None;
    }

    event.data = data.join("\n");
    Some(event)
}

/// Incremental event stream decoder.
///
/// Input may be fed in arbitrary pieces, an incomplete trailing block is kept
/// until the rest of it arrives.
///
/// # Test
///
/// ```
/// use sse_push_codec::Decoder;
///
/// let mut decoder = Decoder::default();
///
/// assert!(decoder.decode(b"data: hel").unwrap().is_empty());
///
/// let events = decoder.decode(b"lo\n\n").unwrap();
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].data, "hello");
/// ```
#[derive(Default)]
pub struct Decoder(BytesMut);

impl Decoder {
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Vec<Event>, Error> {
        self.0.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some((size, skip)) = find_boundary(&self.0) {
            let block = self.0.split_to(size);
            self.0.advance(skip);

            if let Some(event) = parse_block(std::str::from_utf8(&block)?) {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Number of buffered bytes that do not form a complete event yet.
    pub fn pending(&self) -> usize {
        self.0.len()
    }
}
