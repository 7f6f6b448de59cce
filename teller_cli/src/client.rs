//! Driving a client session from user input

use crate::error::{CliError, CliResult};
use crate::prompt::{self, Choice};
use colored::Colorize;
use std::io::Write;
use teller_core::{ClientSession, DatagramTransport, Reply};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// What a finished session did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub executed: usize,
    pub rejected_lines: usize,
}

/// Print one reply the way the session output shows it
pub fn print_reply(out: &mut impl Write, reply: &Reply, color: bool) -> std::io::Result<()> {
    if color {
        writeln!(out, "{}", reply.text.green())
    } else {
        writeln!(out, "{}", reply.text)
    }
}

/// Execute `<code> [amount]` lines from `input` until Stop or end of input.
///
/// Lines that do not parse are reported on stderr and skipped. A session
/// that gives up on the server ends the run with a network error.
pub async fn run_script<T, R, W>(
    session: &mut ClientSession<T>,
    input: R,
    out: &mut W,
) -> CliResult<SessionSummary>
where
    T: DatagramTransport,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut summary = SessionSummary::default();
    let mut lines = input.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CliError::general(&format!("Failed to read input: {e}")))?
    {
        let choice = match prompt::parse_line(&line) {
            Ok(Some(choice)) => choice,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Skipping input line {line:?}: {e}");
                eprintln!("{}", format!("Skipping '{}': {e}", line.trim()).yellow());
                summary.rejected_lines += 1;
                continue;
            }
        };

        let Choice::Execute(operation) = choice else {
            break;
        };
        let reply = session.execute(operation).await?;
        print_reply(out, &reply, false)
            .map_err(|e| CliError::general(&format!("Failed to write output: {e}")))?;
        summary.executed += 1;
    }

    Ok(summary)
}

/// Prompt with menus until the user picks Stop
pub async fn run_interactive<T: DatagramTransport>(
    session: &mut ClientSession<T>,
) -> CliResult<SessionSummary> {
    let mut summary = SessionSummary::default();
    let mut stdout = std::io::stdout();

    loop {
        let Choice::Execute(operation) = prompt::choose_interactively()? else {
            break;
        };
        let reply = session.execute(operation).await?;
        print_reply(&mut stdout, &reply, true)
            .map_err(|e| CliError::general(&format!("Failed to write output: {e}")))?;
        println!();
        summary.executed += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teller_core::{Operation, RequestId};

    #[test]
    fn test_print_reply_plain() {
        let reply = Reply {
            request_id: RequestId::new(0),
            operation: Operation::ViewBalance.code().code(),
            text: "Your current balance is:0".to_string(),
        };
        let mut out = Vec::new();
        print_reply(&mut out, &reply, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Your current balance is:0\n");
    }
}
