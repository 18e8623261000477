//! Reassembles streamed completion fragments into newline-terminated lines.
//!
//! Fragments may split a line anywhere, mid-word included. Lines are emitted
//! as soon as their newline arrives; whatever trails the last newline is
//! emitted once when the source ends. A failing source ends the output with
//! its error and the pending partial line is dropped.

use futures::{Stream, StreamExt};

/// Per-call accumulation state.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
    emitted_lines: usize,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
            emitted_lines: 0,
        }
    }

    /// Append a fragment and return every line it completes.
    ///
    /// The buffer never holds a newline between calls, so only the new
    /// fragment has to be scanned.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = fragment;

        while let Some(idx) = rest.find('\n') {
            let (head, tail) = rest.split_at(idx + 1);
            let mut line = std::mem::take(&mut self.buffer);
            line.push_str(head);
            lines.push(line);
            rest = tail;
        }

        self.buffer.push_str(rest);
        self.emitted_lines += lines.len();
        lines
    }

    /// Take the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        self.emitted_lines += 1;
        Some(std::mem::take(&mut self.buffer))
    }

    /// Drop any partial line without emitting it.
    pub fn discard(&mut self) {
        self.buffer.clear();
    }

    /// Text received since the last newline.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Number of items emitted so far.
    #[must_use]
    pub const fn emitted_lines(&self) -> usize {
        self.emitted_lines
    }
}

/// Turn a fragment stream into a line stream.
///
/// Each successful item but the last ends with exactly one `'\n'`; the last
/// may be an unterminated remainder. On the first source error the error is
/// yielded and the stream ends.
pub fn reassemble_lines<S, E>(source: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<String, E>>,
{
    async_stream::stream! {
        let mut buffer = LineBuffer::new();
        futures::pin_mut!(source);

        while let Some(fragment) = source.next().await {
            match fragment {
                Ok(fragment) => {
                    for line in buffer.push(&fragment) {
                        yield Ok(line);
                    }
                }
                Err(err) => {
                    buffer.discard();
                    yield Err(err);
                    return;
                }
            }
        }

        if let Some(rest) = buffer.finish() {
            yield Ok(rest);
        }
    }
}
