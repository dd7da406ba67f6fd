// guard.rs - Interactive check on an existing output file
//
// Only the interactive entry point goes through here. Non-interactive runs
// use `OutputPolicy::Truncate` and never prompt.

use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::path::Path;

use tracing::info;

use crate::error::{GenError, Result};
use crate::generator::OutputPolicy;

/// How often an unrecognized answer is re-asked before giving up.
pub const MAX_ATTEMPTS: usize = 3;

/// Source of answers for the guard's questions.
pub trait Prompter {
    /// Show `question` and return the raw answer, `None` at end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;

    /// Informational message for the user.
    fn say(&mut self, _message: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Prompter over any line-based reader and writer.
pub struct ConsolePrompter<R, W> {
    input:  R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl ConsolePrompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        writeln!(self.output, " {question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, " {message}")?;
        self.output.flush()
    }
}

/// What the guard decided about the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Nothing was there.
    Fresh,
    /// The old file was deleted.
    Removed,
    /// The old file is kept and new records go after it.
    Append,
}

impl GuardOutcome {
    /// Policy the generator should run with afterwards.
    pub fn policy(self) -> OutputPolicy {
        match self {
            GuardOutcome::Fresh | GuardOutcome::Removed => OutputPolicy::Truncate,
            GuardOutcome::Append => OutputPolicy::Append,
        }
    }
}

/// Ask `question` until the first character of the answer matches one of
/// `options`. Gives up after [`MAX_ATTEMPTS`] or at end of input.
fn ask_choice<P: Prompter, C: Copy>(prompter: &mut P, question: &str, options: &[(char, C)]) -> Result<C> {
    let mut last = String::new();
    for _ in 0..MAX_ATTEMPTS {
        let Some(answer) = prompter.ask(question)? else {
            return Err(GenError::UnrecognizedAnswer("<end of input>".into()));
        };
        let first = answer.trim().chars().next().map(|c| c.to_ascii_lowercase());
        if let Some(&(_, choice)) = options.iter().find(|(key, _)| Some(*key) == first) {
            return Ok(choice);
        }
        last = answer.trim().to_string();
        prompter.say(&format!("PLEASE ANSWER {}", keys(options)))?;
    }
    Err(GenError::UnrecognizedAnswer(last))
}

fn keys<C>(options: &[(char, C)]) -> String {
    let k: Vec<String> = options.iter().map(|(c, _)| c.to_string()).collect();
    format!("[{}]", k.join("/"))
}

#[derive(Clone, Copy)]
enum Remove {
    Yes,
    No,
}

#[derive(Clone, Copy)]
enum Next {
    Quit,
    Append,
}

/// Decide what to do with an existing output file before sweeping.
///
/// `Err(GenError::UserQuit)` means the user asked to stop; no sweep work
/// should happen after it.
pub fn prompt_if_file<P: Prompter>(path: &Path, prompter: &mut P) -> Result<GuardOutcome> {
    if !path.exists() {
        return Ok(GuardOutcome::Fresh);
    }

    let question = format!("WARNING: FILE EXISTS... REMOVE {} [y/n]", path.display());
    match ask_choice(prompter, &question, &[('y', Remove::Yes), ('n', Remove::No)])? {
        Remove::Yes => {
            prompter.say(&format!("OK, REMOVING {}", path.display()))?;
            std::fs::remove_file(path)?;
            info!(path = %path.display(), "removed existing output file");
            Ok(GuardOutcome::Removed)
        }
        Remove::No => {
            match ask_choice(prompter, "QUIT OR APPEND ANYWAY? [q/a]", &[('q', Next::Quit), ('a', Next::Append)])? {
                Next::Quit => {
                    prompter.say("OK, QUITTING")?;
                    Err(GenError::UserQuit)
                }
                Next::Append => {
                    prompter.say("CONTINUING")?;
                    info!(path = %path.display(), "appending to existing output file");
                    Ok(GuardOutcome::Append)
                }
            }
        }
    }
}
