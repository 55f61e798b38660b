//! Newline-delimited JSON framing for streamed generation responses.
//!
//! Network chunks do not line up with JSON fragments: one read can carry
//! several fragments, or end in the middle of one. The decoder buffers bytes
//! until a newline completes a fragment.

use crate::client::LlmStreamChunk;
use odes_core::{AppError, AppResult};
use serde::Deserialize;

/// Wire format of one fragment (`{"response": "...", "done": false}`).
#[derive(Debug, Deserialize)]
pub(crate) struct WireFragment {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Incremental NDJSON decoder.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every fragment completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<AppResult<LlmStreamChunk>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(item) = decode_line(&line) {
                out.push(item);
            }
        }
        out
    }

    /// Decode whatever is left once the byte stream has closed.
    pub fn finish(&mut self) -> Option<AppResult<LlmStreamChunk>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

/// Decode one line; blank lines yield nothing.
fn decode_line(line: &[u8]) -> Option<AppResult<LlmStreamChunk>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Err(AppError::ChunkDecode(format!("invalid UTF-8: {}", e)))),
    };

    if text.is_empty() {
        return None;
    }

    let fragment: WireFragment = match serde_json::from_str(text) {
        Ok(fragment) => fragment,
        Err(e) => return Some(Err(AppError::ChunkDecode(format!("{}: {}", e, preview(text))))),
    };

    if let Some(error) = fragment.error {
        return Some(Err(AppError::Llm(format!("Generation failed mid-stream: {}", error))));
    }

    Some(Ok(LlmStreamChunk {
        content: fragment.response,
        done: fragment.done,
    }))
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(80).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(items: Vec<AppResult<LlmStreamChunk>>) -> Vec<String> {
        items
            .into_iter()
            .map(|item| item.map(|c| c.content).unwrap_or_else(|_| "<err>".to_string()))
            .collect()
    }

    #[test]
    fn test_multiple_fragments_in_one_read() {
        let mut decoder = NdjsonDecoder::new();
        let items = decoder.push(b"{\"response\":\"Hel\"}\n{\"response\":\"lo\"}\n");
        assert_eq!(contents(items), vec!["Hel", "lo"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_fragment_split_across_reads() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(b"{\"respo").is_empty());
        assert!(decoder.push(b"nse\":\"Hi").is_empty());
        let items = decoder.push(b" there\",\"done\":false}\n");
        assert_eq!(contents(items), vec!["Hi there"]);
    }

    #[test]
    fn test_multibyte_char_split_across_reads() {
        let line = "{\"response\":\"caf\u{e9}\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(&line[..split]).is_empty());
        let items = decoder.push(&line[split..]);
        assert_eq!(contents(items), vec!["caf\u{e9}"]);
    }

    #[test]
    fn test_malformed_fragment_is_isolated() {
        let mut decoder = NdjsonDecoder::new();
        let items = decoder.push(b"{\"response\":\"a\"}\nnot json\n{\"response\":\"b\"}\n");
        assert_eq!(items.len(), 3);
        assert!(matches!(items[1], Err(AppError::ChunkDecode(_))));
        assert_eq!(contents(items), vec!["a", "<err>", "b"]);
    }

    #[test]
    fn test_unterminated_single_object_decoded_on_finish() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder
            .push(b"{\"model\":\"mistral\",\"response\":\"Whole answer\",\"done\":true}")
            .is_empty());
        let last = decoder.finish().unwrap().unwrap();
        assert_eq!(last, LlmStreamChunk::last("Whole answer"));
    }

    #[test]
    fn test_error_fragment_is_not_a_decode_error() {
        let mut decoder = NdjsonDecoder::new();
        let items = decoder.push(b"{\"error\":\"model crashed\"}\n");
        assert!(matches!(items[0], Err(AppError::Llm(_))));
    }

    #[test]
    fn test_blank_lines_ignored() {
        let mut decoder = NdjsonDecoder::new();
        let items = decoder.push(b"\n\r\n{\"response\":\"x\"}\r\n");
        assert_eq!(contents(items), vec!["x"]);
    }
}
