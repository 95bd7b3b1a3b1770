// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: String,
    pub amount: Decimal,
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Income,
    Expense,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Income => "income",
            TxType::Expense => "expense",
        }
    }

    /// Signed contribution of a non-negative `amount` to the balance.
    pub fn effect(&self, amount: Decimal) -> Decimal {
        match self {
            TxType::Income => amount,
            TxType::Expense => -amount,
        }
    }
}

impl FromStr for TxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TxType::Income),
            "expense" => Ok(TxType::Expense),
            other => Err(Error::invalid(format!(
                "transaction type '{}' must be income or expense",
                other
            ))),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub amount: Decimal,
    pub category: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub account: String,
    pub date: NaiveDate,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn effect(&self) -> Decimal {
        self.tx_type.effect(self.amount)
    }

    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        let date = self.date.to_string();
        let amount = self.amount.to_string();
        [
            self.title.as_str(),
            self.category.as_str(),
            self.description.as_str(),
            self.account.as_str(),
            date.as_str(),
            self.tx_type.as_str(),
            amount.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// A transaction as entered, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub title: String,
    pub amount: Decimal,
    pub category: String,
    pub tx_type: TxType,
    pub account: String,
    pub date: NaiveDate,
    pub description: String,
}

/// Raw edit form; amount and type are parsed by the ledger before any store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEdit {
    pub title: String,
    pub amount: String,
    pub category: String,
    pub tx_type: String,
    pub account: String,
    pub date: NaiveDate,
    pub description: String,
}

impl From<&Transaction> for TransactionEdit {
    fn from(tx: &Transaction) -> Self {
        TransactionEdit {
            title: tx.title.clone(),
            amount: tx.amount.to_string(),
            category: tx.category.clone(),
            tx_type: tx.tx_type.to_string(),
            account: tx.account.clone(),
            date: tx.date,
            description: tx.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posted {
    pub transaction: Transaction,
    pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Audit {
    pub stored: Decimal,
    pub computed: Decimal,
    pub transactions: usize,
}

impl Audit {
    /// Saturates at the `Decimal` bounds when the two sides are far apart.
    pub fn drift(&self) -> Decimal {
        self.stored.saturating_sub(self.computed)
    }

    pub fn is_consistent(&self) -> bool {
        self.stored == self.computed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDraft {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderBoard {
    pub pending: Vec<Reminder>,
    pub completed: Vec<Reminder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_type_parses_case_insensitively() {
        assert_eq!(" Income ".parse::<TxType>().unwrap(), TxType::Income);
        assert_eq!("EXPENSE".parse::<TxType>().unwrap(), TxType::Expense);
        assert!(matches!(
            "transfer".parse::<TxType>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn effect_sign_follows_type() {
        let amt = Decimal::new(3000, 2);
        assert_eq!(TxType::Income.effect(amt), amt);
        assert_eq!(TxType::Expense.effect(amt), -amt);
    }
}
