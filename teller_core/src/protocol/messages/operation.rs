//! Operation codes and the closed set of account operations

use crate::protocol::error::{ProtocolError, Result};
use std::fmt;

/// Numeric operation codes as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationCode {
    ViewBalance,
    Deposit,
    Withdraw,
    /// Client-local sentinel; never sent as a request
    Stop,
}

impl OperationCode {
    /// Every code, in menu order
    pub const ALL: [OperationCode; 4] = [
        OperationCode::ViewBalance,
        OperationCode::Deposit,
        OperationCode::Withdraw,
        OperationCode::Stop,
    ];

    pub fn code(self) -> i32 {
        match self {
            OperationCode::ViewBalance => 1,
            OperationCode::Deposit => 2,
            OperationCode::Withdraw => 3,
            OperationCode::Stop => -1,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(OperationCode::ViewBalance),
            2 => Ok(OperationCode::Deposit),
            3 => Ok(OperationCode::Withdraw),
            -1 => Ok(OperationCode::Stop),
            other => Err(ProtocolError::invalid_operation(other)),
        }
    }

    /// Whether the operation takes an amount
    pub fn takes_amount(self) -> bool {
        matches!(self, OperationCode::Deposit | OperationCode::Withdraw)
    }

    pub fn name(self) -> &'static str {
        match self {
            OperationCode::ViewBalance => "VIEW_BALANCE",
            OperationCode::Deposit => "DEPOSIT",
            OperationCode::Withdraw => "WITHDRAW",
            OperationCode::Stop => "STOP",
        }
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An operation the client can ask the server to execute.
///
/// Stop has no variant here, so it cannot be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ViewBalance,
    Deposit(i64),
    Withdraw(i64),
}

impl Operation {
    /// Build an operation from a code and an optional amount
    pub fn new(code: OperationCode, amount: Option<i64>) -> Result<Option<Self>> {
        let amount_for = |code: OperationCode| {
            amount.ok_or_else(|| ProtocolError::invalid_amount("", format!("{code} needs an amount")))
        };

        let operation = match code {
            OperationCode::ViewBalance => Operation::ViewBalance,
            OperationCode::Deposit => Operation::Deposit(check_amount(amount_for(code)?)?),
            OperationCode::Withdraw => Operation::Withdraw(check_amount(amount_for(code)?)?),
            OperationCode::Stop => return Ok(None),
        };
        Ok(Some(operation))
    }

    pub fn code(&self) -> OperationCode {
        match self {
            Operation::ViewBalance => OperationCode::ViewBalance,
            Operation::Deposit(_) => OperationCode::Deposit,
            Operation::Withdraw(_) => OperationCode::Withdraw,
        }
    }

    /// Split into the code and payload carried by a request
    pub fn to_request_parts(&self) -> (OperationCode, String) {
        match self {
            Operation::ViewBalance => (OperationCode::ViewBalance, String::new()),
            Operation::Deposit(amount) => (OperationCode::Deposit, amount.to_string()),
            Operation::Withdraw(amount) => (OperationCode::Withdraw, amount.to_string()),
        }
    }

    /// Rebuild an operation from a request's code and payload
    pub fn from_request(code: i32, payload: &str) -> Result<Self> {
        match OperationCode::from_code(code)? {
            OperationCode::ViewBalance => Ok(Operation::ViewBalance),
            OperationCode::Deposit => Ok(Operation::Deposit(parse_amount(payload)?)),
            OperationCode::Withdraw => Ok(Operation::Withdraw(parse_amount(payload)?)),
            OperationCode::Stop => Err(ProtocolError::invalid_operation(code)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ViewBalance => write!(f, "VIEW_BALANCE"),
            Operation::Deposit(amount) => write!(f, "DEPOSIT({amount})"),
            Operation::Withdraw(amount) => write!(f, "WITHDRAW({amount})"),
        }
    }
}

fn parse_amount(payload: &str) -> Result<i64> {
    let amount = payload
        .trim()
        .parse::<i64>()
        .map_err(|e| ProtocolError::invalid_amount(payload, e.to_string()))?;
    check_amount(amount)
}

fn check_amount(amount: i64) -> Result<i64> {
    if amount < 0 {
        return Err(ProtocolError::invalid_amount(
            amount.to_string(),
            "amount must not be negative",
        ));
    }
    Ok(amount)
}
