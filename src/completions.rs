use std::io::{self, Write};

use clap_complete::{generate, Shell};
use scorepad::app::AppError;

const BIN_NAME: &str = "scorepad";

/// Writes the completion script for `shell` covering every subcommand.
fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = crate::cli::styled_command();
    generate(shell, &mut cmd, BIN_NAME, out);
}

pub fn run_completions_command(shell: Shell) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    write_completions(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}
