//! Reading operations from the user
//!
//! On a terminal the user picks from a menu and types an amount. Otherwise
//! each input line is `<code> [amount]` using the wire operation codes, so
//! `2 100` deposits 100 and `-1` stops.

use anyhow::{Context, Result};
use dialoguer::{Input, Select};
use teller_core::{Operation, OperationCode};
use thiserror::Error;

/// One decision read from the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Execute(Operation),
    Stop,
}

/// A line that does not describe an operation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("'{0}' is not an operation code")]
    NotACode(String),

    #[error("Unknown operation code {0}")]
    UnknownCode(i32),

    #[error("{0} needs an amount")]
    MissingAmount(OperationCode),

    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),

    #[error("Amount must not be negative")]
    NegativeAmount,

    #[error("Unexpected input after {0}")]
    TrailingInput(OperationCode),
}

/// Parse a `<code> [amount]` line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Choice>, InputError> {
    let mut words = line.split_whitespace();
    let Some(code) = words.next() else {
        return Ok(None);
    };

    let code: i32 = code
        .parse()
        .map_err(|_| InputError::NotACode(code.to_string()))?;
    let code = OperationCode::from_code(code).map_err(|_| InputError::UnknownCode(code))?;

    let amount = if code.takes_amount() {
        let word = words.next().ok_or(InputError::MissingAmount(code))?;
        Some(parse_amount(word)?)
    } else {
        None
    };

    if words.next().is_some() {
        return Err(InputError::TrailingInput(code));
    }

    choice_for(code, amount).map(Some)
}

fn choice_for(code: OperationCode, amount: Option<i64>) -> Result<Choice, InputError> {
    Operation::new(code, amount)
        .map(|operation| operation.map_or(Choice::Stop, Choice::Execute))
        .map_err(|_| InputError::MissingAmount(code))
}

/// Parse a non-negative amount
pub fn parse_amount(word: &str) -> Result<i64, InputError> {
    let amount: i64 = word
        .trim()
        .parse()
        .map_err(|_| InputError::InvalidAmount(word.to_string()))?;
    if amount < 0 {
        return Err(InputError::NegativeAmount);
    }
    Ok(amount)
}

/// Ask for the next operation with menus
pub fn choose_interactively() -> Result<Choice> {
    let items: Vec<String> = OperationCode::ALL
        .iter()
        .map(|code| format!("{}: {}", code.code(), code.name()))
        .collect();

    let selected = Select::new()
        .with_prompt("Would you like to")
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to read operation")?;

    let code = OperationCode::ALL[selected];
    if !code.takes_amount() {
        return Ok(choice_for(code, None)?);
    }

    let amount: String = Input::new()
        .with_prompt("Enter amount")
        .validate_with(|input: &String| -> Result<(), String> {
            parse_amount(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .context("Failed to read amount")?;
    let amount = parse_amount(&amount)?;

    Ok(choice_for(code, Some(amount))?)
}
