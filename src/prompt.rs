//! Operator input
//!
//! On a terminal the prompts use `dialoguer`; when stdin is piped they fall
//! back to plain line reads so the menu can be scripted.

use std::io::{self, BufRead, IsTerminal, Write};

pub trait Prompt {
    /// Ask for one line of input. `None` means end of input.
    fn read_line(&mut self, message: &str) -> io::Result<Option<String>>;
}

pub struct TerminalPrompt {
    interactive: bool,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal() && console::user_attended(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for TerminalPrompt {
    fn read_line(&mut self, message: &str) -> io::Result<Option<String>> {
        if self.interactive {
            let answer = dialoguer::Input::<String>::new()
                .with_prompt(message)
                .allow_empty(true)
                .interact_text()
                .map_err(|err| match err {
                    dialoguer::Error::IO(e) => e,
                })?;
            return Ok(Some(answer.trim().to_string()));
        }

        let mut stdout = io::stdout();
        write!(stdout, "{}: ", message)?;
        stdout.flush()?;

        // Bytes, so a line that is not UTF-8 still comes back as a bad answer.
        let mut line = Vec::new();
        let read = io::stdin().lock().read_until(b'\n', &mut line)?;
        if read == 0 {
            writeln!(stdout)?;
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
    }
}
