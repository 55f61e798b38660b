//! Citation extraction from generated answers.
//!
//! Answers cite evidence as `Source: <filename> (Page <n>)`. The extractor
//! splits text into plain and citation segments such that concatenating the
//! segment contents reproduces the input exactly. It is safe to run on a
//! partial answer: an incomplete citation stays plain text until the closing
//! parenthesis arrives.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(Source:\s+([^(\n]+?)\s+\(Page\s+(\d+)\))")
        .expect("citation regex is valid")
});

/// A piece of answer text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Text {
        content: String,
    },
    Citation {
        /// The matched citation text, verbatim
        content: String,
        filename: String,
        page: u32,
    },
}

impl Segment {
    pub fn content(&self) -> &str {
        match self {
            Segment::Text { content } | Segment::Citation { content, .. } => content,
        }
    }

    pub fn is_citation(&self) -> bool {
        matches!(self, Segment::Citation { .. })
    }
}

/// Split `input` into text and citation segments in a single pass.
///
/// Whitespace preceding a citation stays in the preceding text segment.
/// Filenames never span lines, and a bare `Source:` earlier on the same line
/// is left as text.
pub fn extract_segments(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in CITATION_RE.captures_iter(input) {
        let (Some(whole), Some(name), Some(page)) = (caps.get(1), caps.get(2), caps.get(3)) else {
            continue;
        };
        let Ok(page) = page.as_str().parse::<u32>() else {
            continue;
        };

        let mut start = whole.start();
        let mut filename = name.as_str();
        if let Some(i) = filename.rfind(" Source:") {
            let inner = &filename[i + " Source:".len()..];
            if inner.starts_with(char::is_whitespace) && !inner.trim().is_empty() {
                start = name.start() + i + 1;
                filename = inner;
            }
        }

        let filename = filename.trim();
        if filename.is_empty() {
            continue;
        }

        if start > last {
            segments.push(Segment::Text {
                content: input[last..start].to_string(),
            });
        }
        segments.push(Segment::Citation {
            content: input[start..whole.end()].to_string(),
            filename: filename.to_string(),
            page,
        });
        last = whole.end();
    }

    if last < input.len() {
        segments.push(Segment::Text {
            content: input[last..].to_string(),
        });
    }

    segments
}

/// Concatenate segment contents.
pub fn reconstruct(segments: &[Segment]) -> String {
    segments.iter().map(Segment::content).collect()
}

/// Distinct `(filename, page)` pairs in order of first appearance.
pub fn cited_documents(segments: &[Segment]) -> Vec<(String, u32)> {
    let mut cited: Vec<(String, u32)> = Vec::new();
    for segment in segments {
        if let Segment::Citation { filename, page, .. } = segment {
            let key = (filename.clone(), *page);
            if !cited.contains(&key) {
                cited.push(key);
            }
        }
    }
    cited
}
