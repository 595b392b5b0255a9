//! File-block response protocol.
//!
//! ```text
//! --- FILE: path/to/file.rs ---
//! <full file contents>
//! --- FILE: path/to/next.md ---
//! <full file contents>
//! ```
//!
//! Each block runs until the next `--- FILE:` or end of input. Paths and
//! contents are trimmed. Text without any marker parses to no blocks.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const MARKER_PREFIX: &str = "--- FILE:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    pub path: String,
    pub content: String,
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"--- FILE: (.*?) ---\n").expect("static regex"))
}

fn cycle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[cycle (\d+)\]").expect("static regex"))
}

pub fn parse_file_blocks(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(caps) = marker_re().captures_at(text, pos) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let start = whole.end();
        let end = text[start..]
            .find(MARKER_PREFIX)
            .map(|i| start + i)
            .unwrap_or(text.len());
        let path = path.as_str().trim();
        if path.is_empty() {
            tracing::warn!("Skipping file block with empty path");
        } else {
            blocks.push(FileBlock {
                path: path.to_string(),
                content: text[start..end].trim().to_string(),
            });
        }
        pos = end;
    }
    blocks
}

/// Render a path → content map in the same block format.
pub fn render_file_blocks(files: &BTreeMap<String, String>) -> String {
    files
        .iter()
        .map(|(path, content)| format!("{} {} ---\n{}", MARKER_PREFIX, path, content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cycle index from a `[cycle N]` task tag.
pub fn task_cycle(text: &str) -> Option<u32> {
    cycle_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
