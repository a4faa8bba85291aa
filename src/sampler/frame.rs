//! Frame assembly for the sampling tool's line stream
//!
//! `intel_gpu_top -J` prints one JSON object per sample, spread over many
//! lines, with nothing in between to mark where one object ends. The only
//! boundary markers are a line that is exactly `{` and a line that is
//! exactly `}`. No interior line ever consists of a bare brace.
//!
//! [`FrameBuffer`] is the state machine: it collects lines from `{` to `}`
//! and hands back the concatenated text. [`FrameAssembler`] drives it over
//! any line iterator (normally the child's stdout).
//!
//! # Known gaps
//!
//! - A `}` without a preceding `{` emits whatever has accumulated, possibly
//!   just `}`. The decoder rejects it.
//! - The buffer is not cleared after `}`. Stray lines before the next `{`
//!   are appended to the already emitted frame, and a second `}` emits all
//!   of it again. The decoder rejects that too.
//! - An object still open when the stream ends is dropped without being
//!   emitted.

use std::io;

/// Line that opens a frame
pub const FRAME_OPEN: &str = "{";
/// Line that closes a frame
pub const FRAME_CLOSE: &str = "}";

/// Accumulates lines of one frame
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: String,
}

impl FrameBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line, returning the finished frame when `line` closes it
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        match line {
            FRAME_OPEN => {
                self.buf.clear();
                self.buf.push_str(line);
                None
            }
            FRAME_CLOSE => {
                self.buf.push_str(line);
                Some(self.buf.clone())
            }
            _ => {
                self.buf.push_str(line);
                None
            }
        }
    }

    /// Text accumulated so far
    pub fn pending(&self) -> &str {
        &self.buf
    }
}

/// Iterator adaptor turning lines into complete frames
///
/// A line read error is yielded once, after which the assembler is
/// exhausted.
pub struct FrameAssembler<L> {
    lines: L,
    buffer: FrameBuffer,
    done: bool,
}

impl<L> FrameAssembler<L>
where
    L: Iterator<Item = io::Result<String>>,
{
    /// Wrap a line source
    pub fn new(lines: L) -> Self {
        Self {
            lines,
            buffer: FrameBuffer::new(),
            done: false,
        }
    }
}

impl<L> Iterator for FrameAssembler<L>
where
    L: Iterator<Item = io::Result<String>>,
{
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if let Some(frame) = self.buffer.push_line(&line) {
                        return Some(Ok(frame));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    if !self.buffer.pending().is_empty() {
                        tracing::trace!(
                            pending_len = self.buffer.pending().len(),
                            "line stream ended, dropping buffered text"
                        );
                    }
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

/// Replace each run of tabs with a single space
///
/// Used only when logging frames. The decoder always gets the verbatim text.
pub fn collapse_tabs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tabs = false;
    for c in input.chars() {
        if c == '\t' {
            if !in_tabs {
                out.push(' ');
                in_tabs = true;
            }
        } else {
            out.push(c);
            in_tabs = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[&str]) -> impl Iterator<Item = io::Result<String>> {
        input
            .iter()
            .map(|l| Ok(l.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn frames(input: &[&str]) -> Vec<String> {
        FrameAssembler::new(lines(input))
            .map(|f| f.unwrap())
            .collect()
    }

    #[test]
    fn test_single_frame_concatenates_lines() {
        let out = frames(&["{", "\t\"rc6\": {", "\t\t\"value\": 1.0", "\t}", "}"]);
        assert_eq!(out, vec!["{\t\"rc6\": {\t\t\"value\": 1.0\t}}".to_string()]);
    }

    #[test]
    fn test_back_to_back_frames_in_order() {
        let out = frames(&["{", "\"a\": 1", "}", "{", "\"b\": 2", "}"]);
        assert_eq!(out, vec!["{\"a\": 1}", "{\"b\": 2}"]);
    }

    #[test]
    fn test_open_resets_buffer() {
        let out = frames(&["garbage", "{", "\"a\": 1", "}"]);
        assert_eq!(out, vec!["{\"a\": 1}"]);
    }

    #[test]
    fn test_close_without_open_emits_accumulated() {
        assert_eq!(frames(&["}"]), vec!["}"]);
        assert_eq!(frames(&["\"x\": 1", "}"]), vec!["\"x\": 1}"]);
    }

    #[test]
    fn test_buffer_kept_after_close() {
        // Lines between a close and the next open extend the old frame.
        let out = frames(&["{", "\"a\": 1", "}", "stray", "}"]);
        assert_eq!(out, vec!["{\"a\": 1}", "{\"a\": 1}stray}"]);
    }

    #[test]
    fn test_unterminated_frame_is_dropped() {
        let out = frames(&["{", "\"a\": 1", "}", "{", "\"b\": 2"]);
        assert_eq!(out, vec!["{\"a\": 1}"]);
    }

    #[test]
    fn test_empty_stream_yields_nothing() {
        assert!(frames(&[]).is_empty());
    }

    #[test]
    fn test_indented_braces_are_not_boundaries() {
        let out = frames(&["{", "\t\"engines\": {", "\t}", "}"]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_read_error_is_yielded_once() {
        let source = vec![
            Ok("{".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8")),
            Ok("}".to_string()),
        ];
        let mut assembler = FrameAssembler::new(source.into_iter());

        let err = assembler.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(assembler.next().is_none());
        assert!(assembler.next().is_none());
    }

    #[test]
    fn test_collapse_tabs() {
        assert_eq!(collapse_tabs("{\t\t\"a\":\t1}"), "{ \"a\": 1}");
        assert_eq!(collapse_tabs("no tabs"), "no tabs");
        assert_eq!(collapse_tabs("\t\t\t"), " ");
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_frames_match_blocks(
            blocks in prop::collection::vec(
                prop::collection::vec("[a-z0-9\" :,\t]{0,12}", 0..6),
                0..6
            )
        ) {
            let mut input = Vec::new();
            let mut expected = Vec::new();
            for block in &blocks {
                input.push("{".to_string());
                input.extend(block.iter().cloned());
                input.push("}".to_string());
                expected.push(format!("{{{}}}", block.concat()));
            }

            let out: Vec<String> = FrameAssembler::new(input.into_iter().map(Ok))
                .map(|f| f.unwrap())
                .collect();

            // Property: one frame per block, in order, each exactly its own lines
            prop_assert_eq!(out, expected);
        }

        #[test]
        fn test_collapsed_text_has_no_tabs(s in "[a-z\t ]{0,40}") {
            let collapsed = collapse_tabs(&s);
            prop_assert!(!collapsed.contains('\t'));
            prop_assert!(collapsed.len() <= s.len());
        }
    }
}
