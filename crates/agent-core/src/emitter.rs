//! Script recording.
//!
//! Both emitters produce the same artifact shape: a Playwright test file
//! with one test titled after the goal, statements appended in execution
//! order. File mode streams to disk so a crashed run still leaves the
//! statements recorded so far; memory mode keeps everything in a string for
//! in-process hosts.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::errors::AgentError;

/// Accumulates validated code fragments into the output artifact.
pub trait ScriptEmitter: Send {
    /// Open the scaffold for a run with the given goal.
    fn init(&mut self, goal: &str) -> Result<(), AgentError>;

    /// Append one statement, optionally prefaced by the planner's thought.
    fn append_code(&mut self, code: &str, thought: Option<&str>) -> Result<(), AgentError>;

    /// Close the scaffold.
    fn finish(&mut self) -> Result<(), AgentError>;

    /// File path in file mode, the script text in memory mode.
    fn output(&self) -> String;
}

fn scaffold_header(goal: &str) -> String {
    let escaped = goal.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "import {{ test, expect }} from '@playwright/test';\n\n\
         // Recorded by flash-loop on {}\n\
         test('{escaped}', async ({{ page, context }}) => {{\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn scaffold_footer() -> &'static str {
    "});\n"
}

fn indent_fragment(code: &str, thought: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(thought) = thought.filter(|t| !t.trim().is_empty()) {
        for line in thought.lines() {
            out.push_str("  // ");
            out.push_str(line.trim());
            out.push('\n');
        }
    }
    for line in code.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Streams the script to a timestamped file under the output directory.
pub struct FileEmitter {
    path: PathBuf,
    initialized: bool,
}

impl FileEmitter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let name = format!("flash-loop-{}.spec.ts", Utc::now().format("%Y%m%d-%H%M%S"));
        Self {
            path: dir.as_ref().join(name),
            initialized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, text: &str) -> Result<(), AgentError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

impl ScriptEmitter for FileEmitter {
    fn init(&mut self, goal: &str) -> Result<(), AgentError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, scaffold_header(goal))?;
        self.initialized = true;
        Ok(())
    }

    fn append_code(&mut self, code: &str, thought: Option<&str>) -> Result<(), AgentError> {
        if !self.initialized {
            return Err(AgentError::Emitter("emitter used before init".to_string()));
        }
        self.append(&indent_fragment(code, thought))
    }

    fn finish(&mut self) -> Result<(), AgentError> {
        if self.initialized {
            self.append(scaffold_footer())?;
        }
        Ok(())
    }

    fn output(&self) -> String {
        self.path.display().to_string()
    }
}

/// Accumulates the script in memory; used by in-process hosts.
#[derive(Default)]
pub struct MemoryEmitter {
    buffer: String,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptEmitter for MemoryEmitter {
    fn init(&mut self, goal: &str) -> Result<(), AgentError> {
        self.buffer = scaffold_header(goal);
        Ok(())
    }

    fn append_code(&mut self, code: &str, thought: Option<&str>) -> Result<(), AgentError> {
        self.buffer.push_str(&indent_fragment(code, thought));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AgentError> {
        self.buffer.push_str(scaffold_footer());
        Ok(())
    }

    fn output(&self) -> String {
        self.buffer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_emitter_well_formed() {
        let mut emitter = MemoryEmitter::new();
        emitter.init("log in as demo").unwrap();
        emitter
            .append_code(
                "await page.getByRole('textbox', { name: 'email', exact: true }).fill('demo');",
                Some("fill the email field"),
            )
            .unwrap();
        emitter
            .append_code("await page.getByRole('button', { name: 'Login', exact: true }).click();", None)
            .unwrap();
        emitter.finish().unwrap();

        let script = emitter.output();
        assert!(script.starts_with("import { test, expect } from '@playwright/test';"));
        assert!(script.contains("test('log in as demo', async ({ page, context }) => {"));
        assert!(script.contains("  // fill the email field\n"));
        assert!(script.contains("  await page.getByRole('textbox'"));
        assert!(script.trim_end().ends_with("});"));
        // Balanced braces, since every fragment is a complete statement.
        assert_eq!(
            script.matches('{').count(),
            script.matches('}').count()
        );
    }

    #[test]
    fn test_goal_quotes_escaped() {
        let mut emitter = MemoryEmitter::new();
        emitter.init("click 'Load more'").unwrap();
        assert!(emitter.output().contains("test('click \\'Load more\\'',"));
    }

    #[test]
    fn test_multiline_fragment_indented() {
        let mut emitter = MemoryEmitter::new();
        emitter.init("g").unwrap();
        emitter
            .append_code("// WARNING: XPath fallback locator\nawait page.locator('xpath=/html[1]').click();", None)
            .unwrap();
        let script = emitter.output();
        assert!(script.contains("  // WARNING: XPath fallback locator\n  await page.locator"));
    }

    #[test]
    fn test_file_emitter_roundtrip() {
        let dir = std::env::temp_dir().join(format!("flashloop-test-{}", std::process::id()));
        let mut emitter = FileEmitter::new(&dir);
        emitter.init("goal").unwrap();
        emitter.append_code("await page.reload();", None).unwrap();
        emitter.finish().unwrap();

        let written = std::fs::read_to_string(emitter.path()).unwrap();
        assert!(written.contains("await page.reload();"));
        assert!(written.trim_end().ends_with("});"));
        assert!(emitter.output().ends_with(".spec.ts"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_emitter_requires_init() {
        let mut emitter = FileEmitter::new(std::env::temp_dir());
        assert!(emitter.append_code("x", None).is_err());
    }
}
