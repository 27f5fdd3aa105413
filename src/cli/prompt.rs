//! Line-editing input shared by every interactive command. Modeled on the
//! `rustyline::DefaultEditor` REPL in the teacher's `crates/gateway/src/cli/chat.rs`,
//! with its `dirs`-crate home lookup swapped for the `HOME`-env pattern
//! `lc_facade::repo_preflight` already uses, since `dirs` isn't part of the
//! dependency stack.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub struct Prompter {
    editor: DefaultEditor,
    history_path: Option<std::path::PathBuf>,
}

impl Prompter {
    pub fn new() -> crate::error::Result<Self> {
        let editor = DefaultEditor::new().map_err(|e| crate::error::Error::Config(e.to_string()))?;
        let history_path = std::env::var("HOME").ok().map(|home| {
            let dir = std::path::PathBuf::from(home).join(".lit-critic");
            let _ = std::fs::create_dir_all(&dir);
            dir.join("history.txt")
        });
        let mut prompter = Self { editor, history_path };
        if let Some(path) = &prompter.history_path {
            let _ = prompter.editor.load_history(path);
        }
        Ok(prompter)
    }

    /// Reads one line, returning `None` on EOF (Ctrl-D) or interrupt (Ctrl-C).
    pub fn read(&mut self, prompt: &str) -> Option<String> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed.as_str());
                }
                Some(trimmed)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(_) => None,
        }
    }
}

impl Drop for Prompter {
    fn drop(&mut self) {
        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }
    }
}
