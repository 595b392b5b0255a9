//! Prompt assembly

use crate::protocol::render_file_blocks;
use std::collections::BTreeMap;

pub const SYSTEM_PROMPT: &str = "\
You rewrite repository files precisely.
Return FULL FILE CONTENTS ONLY, for every file you change.
Do not explain. Do not summarize. No markdown outside the file structure.

MANDATORY FORMAT:
--- FILE: path/to/file.py ---
<full file contents>
--- FILE: path/to/next_file.js ---
<full file contents>";

/// System preamble, the task, then the repository snapshot in block form.
pub fn build_prompt(task: &str, snapshot: &BTreeMap<String, String>) -> String {
    format!(
        "{}\n\nTASK:\n{}\n\nREPO SNAPSHOT:\n{}",
        SYSTEM_PROMPT,
        task,
        render_file_blocks(snapshot)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_task_and_snapshot() {
        let mut snapshot = BTreeMap::new();
        snapshot.insert("README.md".to_string(), "# hi".to_string());
        let prompt = build_prompt("tidy docs [cycle 2]", &snapshot);
        assert!(prompt.starts_with("You rewrite"));
        assert!(prompt.contains("TASK:\ntidy docs [cycle 2]"));
        assert!(prompt.contains("--- FILE: README.md ---\n# hi"));
    }
}
