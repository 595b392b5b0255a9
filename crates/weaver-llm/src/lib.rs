//! Weaver LLM - generation collaborator boundary
//!
//! Concrete HTTP providers live outside this workspace; they plug in by
//! implementing `Generator`.

pub mod prompt;
pub mod protocol;
pub mod provider;
pub mod stub;

pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use protocol::{parse_file_blocks, render_file_blocks, task_cycle, FileBlock};
pub use provider::{Availability, Generator, LlmError, LlmResult};
pub use stub::{DeterministicGenerator, ScriptedGenerator};
