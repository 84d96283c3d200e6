use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};

/// Yes/no question to the user; anything but an explicit yes is a no.
pub(crate) trait Confirm {
    fn confirm(&self, question: &str) -> Result<bool>;
}

pub(crate) struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        if !io::stdin().is_terminal() {
            return Ok(false);
        }

        let mut stdout = io::stdout().lock();
        write!(stdout, "{question} (y/N) ").context("failed to write prompt")?;
        stdout.flush().context("failed to flush prompt")?;

        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("failed to read answer")?;
        Ok(parse_answer(&answer))
    }
}

pub(crate) fn parse_answer(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
