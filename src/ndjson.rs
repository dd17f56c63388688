//! Newline-delimited JSON processing for streaming chat responses.
//!
//! The chat server answers `POST /chat` with one JSON record per line. This
//! module reassembles those records from arbitrarily split byte chunks and
//! decodes each one into a [`ChatEvent`].
//!
//! Bytes are buffered and a line is only decoded once its separator has
//! arrived, so multi-byte characters split across chunks are never seen half
//! decoded. A complete line that fails to parse is held at the front of the
//! buffer until more bytes arrive, then retried joined with the next line.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use serde_json::error::Category;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use crate::observability::{
    STREAM_BYTES, STREAM_DROPPED_RECORDS, STREAM_EVENTS, STREAM_SKIPPED_RECORDS,
};
use crate::{ChatEvent, Error, Result, StreamRecord};

/// Separates records in the response body.
pub const RECORD_SEPARATOR: u8 = b'\n';

enum Record {
    Event(ChatEvent),
    /// Valid JSON that is not a chat record; more bytes cannot fix it.
    Unrecognized,
    /// Truncated or otherwise unparsable JSON.
    Incomplete,
}

fn parse_record(bytes: &[u8]) -> Record {
    match serde_json::from_slice::<StreamRecord>(bytes) {
        Ok(record) => Record::Event(record.into()),
        Err(err) if err.classify() == Category::Data => Record::Unrecognized,
        Err(_) => Record::Incomplete,
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Incremental decoder from response bytes to [`ChatEvent`]s.
///
/// Implements [`Decoder`], so it can drive a `FramedRead` over any
/// `AsyncRead`; [`process_ndjson`] drives it over a chunk stream instead.
#[derive(Debug, Default)]
pub struct ChatEventDecoder {
    // Bytes at the front of the buffer (separator included) belonging to a
    // record that did not parse when its line completed.
    held: usize,
}

impl ChatEventDecoder {
    /// Creates a decoder with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while an unparsable record waits for more bytes.
    pub fn is_holding(&self) -> bool {
        self.held > 0
    }

    fn discard(&mut self, buf: &mut BytesMut, len: usize) {
        buf.advance(len);
        self.held = 0;
    }
}

impl Decoder for ChatEventDecoder {
    type Item = ChatEvent;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ChatEvent>> {
        loop {
            let Some(offset) = buf[self.held..]
                .iter()
                .position(|byte| *byte == RECORD_SEPARATOR)
            else {
                return Ok(None);
            };
            let end = self.held + offset;

            if self.held == 0 {
                if is_blank(&buf[..end]) {
                    buf.advance(end + 1);
                    continue;
                }
                match parse_record(&buf[..end]) {
                    Record::Event(event) => {
                        buf.advance(end + 1);
                        return Ok(Some(event));
                    }
                    Record::Unrecognized => {
                        warn!(len = end, "skipping record that is not a chat event");
                        STREAM_SKIPPED_RECORDS.click();
                        buf.advance(end + 1);
                        continue;
                    }
                    Record::Incomplete => {
                        debug!(len = end, "record did not parse; waiting for more bytes");
                        self.held = end + 1;
                        return Ok(None);
                    }
                }
            }

            // The held record may continue past its separator.
            match parse_record(&buf[..end]) {
                Record::Event(event) => {
                    self.discard(buf, end + 1);
                    return Ok(Some(event));
                }
                Record::Unrecognized => {
                    warn!(len = end, "skipping record that is not a chat event");
                    STREAM_SKIPPED_RECORDS.click();
                    self.discard(buf, end + 1);
                    continue;
                }
                Record::Incomplete => {}
            }

            let line = &buf[self.held..end];
            if is_blank(line) {
                self.held = end + 1;
                continue;
            }
            match parse_record(line) {
                Record::Event(event) => {
                    warn!(len = self.held - 1, "dropping unparsable record");
                    STREAM_DROPPED_RECORDS.click();
                    self.discard(buf, end + 1);
                    return Ok(Some(event));
                }
                Record::Unrecognized => {
                    warn!(len = end, "dropping unparsable record and unrecognized record");
                    STREAM_DROPPED_RECORDS.click();
                    STREAM_SKIPPED_RECORDS.click();
                    self.discard(buf, end + 1);
                    continue;
                }
                Record::Incomplete => {
                    self.held = end + 1;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<ChatEvent>> {
        // Complete lines still buffered get their chance before the tail.
        loop {
            let before = (buf.len(), self.held);
            if let Some(event) = self.decode(buf)? {
                return Ok(Some(event));
            }
            if (buf.len(), self.held) == before {
                break;
            }
        }

        let held = std::mem::take(&mut self.held);
        if is_blank(&buf[..]) {
            buf.clear();
            return Ok(None);
        }
        let tail = buf.split();
        match parse_record(&tail) {
            Record::Event(event) => return Ok(Some(event)),
            Record::Unrecognized => {
                warn!(len = tail.len(), "skipping trailing record that is not a chat event");
                STREAM_SKIPPED_RECORDS.click();
                return Ok(None);
            }
            Record::Incomplete => {}
        }
        if held > 0 && !is_blank(&tail[held..]) {
            if let Record::Event(event) = parse_record(&tail[held..]) {
                warn!(len = held - 1, "dropping unparsable record");
                STREAM_DROPPED_RECORDS.click();
                return Ok(Some(event));
            }
        }
        warn!(len = tail.len(), "dropping unparsable data at end of stream");
        STREAM_DROPPED_RECORDS.click();
        Ok(None)
    }
}

/// Process a stream of response bytes into a stream of chat events.
///
/// Events come out in arrival order, one per non-empty record. An error from
/// the byte stream is yielded once and ends the event stream; unparsable data
/// is logged and dropped, never yielded.
pub fn process_ndjson<S>(byte_stream: S) -> impl Stream<Item = Result<ChatEvent>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    struct State<S> {
        stream: S,
        decoder: ChatEventDecoder,
        buffer: BytesMut,
        eof: bool,
        done: bool,
    }

    let state = State {
        stream: byte_stream,
        decoder: ChatEventDecoder::new(),
        buffer: BytesMut::new(),
        eof: false,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            let decoded = if state.eof {
                state.decoder.decode_eof(&mut state.buffer)
            } else {
                state.decoder.decode(&mut state.buffer)
            };
            match decoded {
                Ok(Some(event)) => {
                    STREAM_EVENTS.click();
                    return Some((Ok(event), state));
                }
                Ok(None) if state.eof => return None,
                Ok(None) => {}
                Err(err) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
            }

            match state.stream.next().await {
                Some(Ok(chunk)) => {
                    STREAM_BYTES.count(chunk.len() as u64);
                    state.buffer.extend_from_slice(&chunk);
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => state.eof = true,
            }
        }
    })
}
