//! Account arithmetic
//!
//! Executing an operation is a pure function of the current balance and the
//! operation. The server calls [`Account::apply`] exactly once per distinct
//! request id.

use crate::protocol::Operation;
use log::info;

/// The single account the server guards
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Account {
    balance: i64,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: i64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// Execute `operation` and return the reply text.
    ///
    /// Overflow leaves the balance unchanged and reports it in the text.
    pub fn apply(&mut self, operation: &Operation) -> String {
        match *operation {
            Operation::ViewBalance => format!("Your current balance is:{}", self.balance),
            Operation::Deposit(amount) => match self.balance.checked_add(amount) {
                Some(balance) => {
                    self.balance = balance;
                    info!("Deposited {amount}, balance {balance}");
                    format!("Deposited {amount}. Your balance is now:{balance}")
                }
                None => format!("Cannot deposit {amount}: balance would overflow"),
            },
            Operation::Withdraw(amount) => match self.balance.checked_sub(amount) {
                Some(balance) => {
                    self.balance = balance;
                    info!("Withdrew {amount}, balance {balance}");
                    format!("Withdrew {amount}. Your balance is now:{balance}")
                }
                None => format!("Cannot withdraw {amount}: balance would overflow"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_from_zero() {
        let mut account = Account::new();
        let text = account.apply(&Operation::Deposit(100));
        assert_eq!(text, "Deposited 100. Your balance is now:100");
        assert_eq!(account.balance(), 100);
    }

    #[test]
    fn test_withdraw_may_go_negative() {
        let mut account = Account::with_balance(30);
        let text = account.apply(&Operation::Withdraw(50));
        assert_eq!(text, "Withdrew 50. Your balance is now:-20");
        assert_eq!(account.balance(), -20);
    }

    #[test]
    fn test_view_balance_mutates_nothing() {
        let mut account = Account::with_balance(42);
        assert_eq!(
            account.apply(&Operation::ViewBalance),
            "Your current balance is:42"
        );
        assert_eq!(account.balance(), 42);
    }

    #[test]
    fn test_overflow_leaves_balance_untouched() {
        let mut account = Account::with_balance(i64::MAX);
        let text = account.apply(&Operation::Deposit(1));
        assert!(text.contains("overflow"));
        assert_eq!(account.balance(), i64::MAX);

        let mut account = Account::with_balance(i64::MIN);
        let text = account.apply(&Operation::Withdraw(1));
        assert!(text.contains("overflow"));
        assert_eq!(account.balance(), i64::MIN);
    }
}
