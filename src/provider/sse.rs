//! Server-sent events decoding for streamed chat completions.
//!
//! Bytes are buffered raw and only decoded once a full event (terminated by
//! a blank line) is available, so multi-byte characters split across network
//! chunks survive intact.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use super::{ApiError, DeltaStream};

/// One decoded SSE event.
#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    /// Joined `data:` lines of an event.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Incremental SSE parser.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns the next complete event carrying data, skipping comment-only
    /// and empty events. `None` means more bytes are needed.
    pub(crate) fn next_event(&mut self) -> Option<Result<SseEvent, ApiError>> {
        loop {
            let (end, delim) = find_event_end(&self.buffer)?;
            let raw: Vec<u8> = self.buffer.drain(..end + delim).take(end).collect();
            if let Some(event) = parse_event(&raw) {
                return Some(event);
            }
        }
    }

    /// Parses whatever is left once the byte stream has ended.
    pub(crate) fn finish(&mut self) -> Option<Result<SseEvent, ApiError>> {
        if let Some(event) = self.next_event() {
            return Some(event);
        }
        let raw = std::mem::take(&mut self.buffer);
        parse_event(&raw)
    }
}

/// Finds the first blank-line terminator, returning (event length, terminator length).
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if buf[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_event(raw: &[u8]) -> Option<Result<SseEvent, ApiError>> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => return Some(Err(ApiError::Decode(format!("invalid UTF-8 in stream: {}", e)))),
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            match data {
                Some(ref mut d) => {
                    d.push('\n');
                    d.push_str(rest);
                }
                None => data = Some(rest.to_string()),
            }
        }
    }

    match data {
        Some(d) if d.trim() == "[DONE]" => Some(Ok(SseEvent::Done)),
        Some(d) => Some(Ok(SseEvent::Data(d))),
        None => None,
    }
}

#[derive(Debug, Deserialize)]
struct ChunkBody {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<super::client::ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts the text delta of one `chat.completion.chunk` payload.
///
/// Chunks without text (role announcements, usage, finish reasons) yield
/// `Ok(None)`. An embedded `error` object becomes [`ApiError::Provider`].
pub(crate) fn parse_chunk(data: &str) -> Result<Option<String>, ApiError> {
    let chunk: ChunkBody = serde_json::from_str(data)
        .map_err(|e| ApiError::Decode(format!("bad stream chunk: {}", e)))?;
    if let Some(err) = chunk.error {
        return Err(err.into_api_error(200));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty()))
}

struct DeltaState<S> {
    bytes: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    finished: bool,
}

/// Turns a response byte stream into a [`DeltaStream`].
///
/// The stream ends at `[DONE]` or when the body ends; it yields at most one
/// error and then ends.
pub(crate) fn delta_stream<S, B, E>(bytes: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DeltaState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        finished: false,
    };

    let stream = stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            let event = match state.decoder.next_event() {
                Some(event) => Some(event),
                None => match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        state.decoder.push(chunk.as_ref());
                        continue;
                    }
                    Some(Err(e)) => {
                        state.finished = true;
                        let err = ApiError::Network(format!("error reading stream: {}", e));
                        return Some((Err(err), state));
                    }
                    None => {
                        state.finished = true;
                        state.decoder.finish()
                    }
                },
            };

            match event {
                None | Some(Ok(SseEvent::Done)) => return None,
                Some(Ok(SseEvent::Data(data))) => match parse_chunk(&data) {
                    Ok(Some(text)) => return Some((Ok(text), state)),
                    Ok(None) => continue,
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                },
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
            }
        }
    });

    Box::pin(stream)
}
