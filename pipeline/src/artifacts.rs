use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PROMPT_FILE: &str = "last_prompt.txt";
pub const OUTPUT_FILE: &str = "last_output.md";

/// Last prompt and model output of the run, overwritten per keyword.
/// Nothing is written when no directory is configured.
#[derive(Debug, Clone, Default)]
pub struct DebugArtifacts {
    dir: Option<PathBuf>,
}

impl DebugArtifacts {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn write_prompt(&self, text: &str) {
        self.write(PROMPT_FILE, text);
    }

    pub fn write_output(&self, text: &str) {
        self.write(OUTPUT_FILE, text);
    }

    fn write(&self, name: &str, text: &str) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(name);
        let result = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, text));
        match result {
            Ok(()) => debug!(path = %path.display(), bytes = text.len(), "Wrote debug artifact"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not write debug artifact"),
        }
    }
}
