use std::fs;
use std::path::{Path, PathBuf};

use rustyline::{
    completion::Completer as RustylineCompleter,
    completion::Pair,
    highlight::Highlighter,
    hint::Hinter,
    validate::Validator,
    Context, Helper, Result,
};

use crate::builtins::BUILTINS;
use crate::utils::path_executables;

/// Tab completion for the interactive prompt: builtins and `PATH` programs in
/// command position, file names everywhere else.
pub struct Completer {
    commands: Vec<String>,
}

impl Completer {
    pub fn new() -> Self {
        let paths = std::env::var("PATH").unwrap_or_default();
        Self::with_commands(path_executables(&paths))
    }

    pub fn with_commands(mut commands: Vec<String>) -> Self {
        commands.extend(BUILTINS.iter().map(|&cmd| cmd.to_string()));
        commands.sort();
        commands.dedup();
        Self { commands }
    }

    /// Candidates for the word ending at the end of `line`.
    pub fn candidates(&self, line: &str) -> Vec<String> {
        // Command position is the start of the line or just after a pipe.
        let segment = line.rsplit('|').next().unwrap_or(line);
        let words: Vec<&str> = segment.split_whitespace().collect();
        let ends_in_space = segment.ends_with(char::is_whitespace);
        match (words.len(), ends_in_space) {
            (0, _) => self.commands.clone(),
            (1, false) => self.complete_command(words[0]),
            (_, true) => self.complete_path(""),
            (_, false) => self.complete_path(words[words.len() - 1]),
        }
    }

    fn complete_command(&self, prefix: &str) -> Vec<String> {
        if prefix.contains('/') {
            return self.complete_path(prefix);
        }
        self.commands
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn complete_path(&self, prefix: &str) -> Vec<String> {
        let (dir, stem) = match prefix.rfind('/') {
            Some(i) => (PathBuf::from(&prefix[..=i]), &prefix[i + 1..]),
            None => (PathBuf::new(), prefix),
        };
        let listing = if dir.as_os_str().is_empty() { Path::new(".") } else { dir.as_path() };

        let mut completions = Vec::new();
        if let Ok(entries) = fs::read_dir(listing) {
            for entry in entries.filter_map(|r| r.ok()) {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if !name.starts_with(stem) || (stem.is_empty() && name.starts_with('.')) {
                    continue;
                }
                let mut full_path = dir.join(&name).to_string_lossy().into_owned();
                if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                    full_path.push('/');
                }
                completions.push(full_path);
            }
        }
        completions.sort();
        completions
    }
}

impl Default for Completer {
    fn default() -> Self {
        Self::new()
    }
}

impl Helper for Completer {}

impl RustylineCompleter for Completer {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || c == '|' || c == '<' || c == '>')
            .map_or(0, |i| i + 1);

        let pairs = self
            .candidates(&line[..pos])
            .into_iter()
            .map(|s| Pair {
                display: s.clone(),
                replacement: s,
            })
            .collect();

        Ok((start, pairs))
    }
}

impl Highlighter for Completer {}
impl Hinter for Completer {
    type Hint = String;
}
impl Validator for Completer {}
