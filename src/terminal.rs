// Console Prompts
//
// Line oriented prompts over any BufRead/Write pair. Menu choices and years
// re-prompt until valid; free text and years can be cancelled with "0",
// which comes back as `Prompted::Cancelled` instead of a magic string.

use std::io::{self, BufRead, Write};
use tracing::info;

use crate::models::fold;

const CANCEL: &str = "0";

/// Outcome of a prompt the user may back out of
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompted<T> {
    Value(T),
    Cancelled,
}

impl<T> Prompted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Prompted<U> {
        match self {
            Prompted::Value(value) => Prompted::Value(f(value)),
            Prompted::Cancelled => Prompted::Cancelled,
        }
    }
}

/// Answer to "show the next page?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Decline,
    Unrecognized,
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print one line
    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    /// Print `prompt` and read one trimmed line. End of input is reported as
    /// `UnexpectedEof`.
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// A number from `allowed`, asked until one is given
    pub fn choice(&mut self, prompt: &str, allowed: &[u32]) -> io::Result<u32> {
        loop {
            let answer = self.ask(prompt)?;
            match answer.parse::<u32>() {
                Ok(choice) if allowed.contains(&choice) => {
                    info!("User selected menu option: {}", choice);
                    return Ok(choice);
                }
                Ok(_) => {
                    let options: Vec<String> = allowed.iter().map(u32::to_string).collect();
                    self.say(&format!("Please enter one of the following numbers: {}", options.join(", ")))?;
                }
                Err(_) => self.say("Invalid input. Please enter a number.")?,
            }
        }
    }

    /// Case-folded free text
    pub fn text(&mut self, prompt: &str) -> io::Result<Prompted<String>> {
        let value = fold(&self.ask(prompt)?);
        info!("User input: '{}' for prompt: '{}'", value, prompt.trim());
        if value == CANCEL {
            return Ok(Prompted::Cancelled);
        }
        Ok(Prompted::Value(value))
    }

    /// A year, asked until the answer is numeric
    pub fn year(&mut self, prompt: &str) -> io::Result<Prompted<i32>> {
        let prompt = format!("{} (or 0 for back to previous menu): ", prompt);
        loop {
            let answer = self.ask(&prompt)?;
            if answer == CANCEL {
                return Ok(Prompted::Cancelled);
            }
            match answer.parse::<i32>() {
                Ok(year) => {
                    info!("User entered year: {} for prompt: {}", year, prompt.trim());
                    return Ok(Prompted::Value(year));
                }
                Err(_) => self.say("Invalid input. Please enter a valid year (numbers only).")?,
            }
        }
    }

    /// Asked once: "yes" continues, "no" or "0" declines, anything else is
    /// unrecognized
    pub fn confirm(&mut self, prompt: &str) -> io::Result<Continuation> {
        let answer = fold(&self.ask(prompt)?);
        Ok(match answer.as_str() {
            "yes" => Continuation::Continue,
            "no" | CANCEL => Continuation::Decline,
            _ => Continuation::Unrecognized,
        })
    }
}
