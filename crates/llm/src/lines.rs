//! Line framing for streamed HTTP bodies.
//!
//! Both Ollama (newline-delimited JSON) and Gemini (server-sent events)
//! stream line-oriented payloads, but network chunks do not respect line
//! boundaries. [`line_stream`] re-frames a byte stream into complete lines.

use futures::{stream, Stream, StreamExt};
use sift_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

struct LineState<S> {
    inner: S,
    idle: Duration,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turn a stream of byte chunks into a stream of non-blank lines.
///
/// A transport error, or no data for `idle`, is yielded once as
/// `AppError::Llm` and ends the stream. A trailing line without a newline is
/// emitted when the body ends.
pub fn line_stream<S, B, E>(
    inner: S,
    idle: Duration,
) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + Unpin,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let state = LineState {
        inner,
        idle,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.pending.pop_front() {
                return Some((Ok(line), st));
            }
            if st.finished {
                return None;
            }

            let next = match tokio::time::timeout(st.idle, st.inner.next()).await {
                Ok(next) => next,
                Err(_) => {
                    st.finished = true;
                    let message = format!("Stream stalled: no data for {:?}", st.idle);
                    return Some((Err(AppError::Llm(message)), st));
                }
            };

            match next {
                Some(Ok(chunk)) => {
                    st.buffer.extend_from_slice(chunk.as_ref());
                    drain_complete_lines(&mut st.buffer, &mut st.pending);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(AppError::Llm(format!("Stream error: {}", e))), st));
                }
                None => {
                    st.finished = true;
                    let rest = std::mem::take(&mut st.buffer);
                    push_line(&rest, &mut st.pending);
                }
            }
        }
    })
}

fn drain_complete_lines(buffer: &mut Vec<u8>, pending: &mut VecDeque<String>) {
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        push_line(&line, pending);
    }
}

fn push_line(raw: &[u8], pending: &mut VecDeque<String>) {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\n', '\r']);
    if !text.trim().is_empty() {
        pending.push_back(text.to_string());
    }
}
