// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Conversion between domain types and wire rows.
//!
//! The reminders table stores `is_completed` as the text `"true"` / `"false"`.
//! That encoding is confined to [`encode_flag`] and [`decode_flag`].

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::Row;
use crate::error::{Error, Result};
use crate::models::{Balance, Reminder, ReminderDraft, Transaction, TransactionDraft, TxType};

pub fn encode_flag(flag: bool) -> Value {
    Value::String(if flag { "true" } else { "false" }.to_string())
}

pub fn decode_flag(v: &Value) -> Result<bool> {
    match v {
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => Err(Error::persistence(format!(
            "is_completed must be \"true\" or \"false\", got {}",
            other
        ))),
    }
}

pub fn encode_timestamp(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn field<'a>(row: &'a Row, key: &str) -> Result<&'a Value> {
    row.get(key)
        .ok_or_else(|| Error::persistence(format!("row is missing '{}'", key)))
}

fn text(row: &Row, key: &str) -> Result<String> {
    match field(row, key)? {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(Error::persistence(format!("'{}' is not text: {}", key, other))),
    }
}

fn int(row: &Row, key: &str) -> Result<i64> {
    field(row, key)?
        .as_i64()
        .ok_or_else(|| Error::persistence(format!("'{}' is not an integer", key)))
}

fn decimal(row: &Row, key: &str) -> Result<Decimal> {
    match field(row, key)? {
        Value::String(s) => s.parse::<Decimal>().map_err(|e| {
            Error::persistence(format!("invalid decimal '{}' in '{}': {}", s, key, e))
        }),
        Value::Number(n) => n.to_string().parse::<Decimal>().map_err(|e| {
            Error::persistence(format!("invalid decimal {} in '{}': {}", n, key, e))
        }),
        other => Err(Error::persistence(format!("'{}' is not a decimal: {}", key, other))),
    }
}

fn date(row: &Row, key: &str) -> Result<NaiveDate> {
    let s = text(row, key)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|e| Error::persistence(format!("invalid date '{}' in '{}': {}", s, key, e)))
}

fn timestamp(row: &Row, key: &str) -> Result<DateTime<Utc>> {
    let s = text(row, key)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::persistence(format!("invalid timestamp '{}' in '{}': {}", s, key, e)))
}

fn object(v: Value) -> Row {
    match v {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub fn balance_from_row(row: &Row) -> Result<Balance> {
    Ok(Balance {
        user_id: text(row, "user_id")?,
        amount: decimal(row, "amount")?,
        version: int(row, "version")?,
    })
}

pub fn balance_row(user_id: &str, amount: Decimal) -> Row {
    object(json!({
        "user_id": user_id,
        "amount": amount.to_string(),
        "version": 0,
    }))
}

pub fn balance_patch(amount: Decimal, version: i64) -> Row {
    object(json!({
        "amount": amount.to_string(),
        "version": version,
    }))
}

pub fn transaction_from_row(row: &Row) -> Result<Transaction> {
    let tx_type = text(row, "type")?
        .parse::<TxType>()
        .map_err(|e| Error::persistence(e.to_string()))?;
    Ok(Transaction {
        id: int(row, "id")?,
        user_id: text(row, "user_id")?,
        title: text(row, "title")?,
        amount: decimal(row, "amount")?,
        category: text(row, "category")?,
        tx_type,
        account: text(row, "account")?,
        date: date(row, "date")?,
        description: text(row, "description")?,
        created_at: timestamp(row, "created_at")?,
    })
}

/// Mutable columns only; shared by insert and edit.
pub fn transaction_fields(draft: &TransactionDraft) -> Row {
    object(json!({
        "title": draft.title,
        "amount": draft.amount.to_string(),
        "category": draft.category,
        "type": draft.tx_type.as_str(),
        "account": draft.account,
        "date": draft.date.to_string(),
        "description": draft.description,
    }))
}

pub fn transaction_row(user_id: &str, draft: &TransactionDraft, created_at: DateTime<Utc>) -> Row {
    let mut row = transaction_fields(draft);
    row.insert("user_id".into(), Value::from(user_id));
    row.insert("created_at".into(), encode_timestamp(created_at));
    row
}

pub fn reminder_from_row(row: &Row) -> Result<Reminder> {
    Ok(Reminder {
        id: int(row, "id")?,
        user_id: text(row, "user_id")?,
        title: text(row, "title")?,
        description: text(row, "description")?,
        due_date: date(row, "due_date")?,
        created_at: timestamp(row, "created_at")?,
        is_completed: decode_flag(field(row, "is_completed")?)?,
    })
}

pub fn reminder_fields(draft: &ReminderDraft) -> Row {
    object(json!({
        "title": draft.title,
        "description": draft.description,
        "due_date": draft.due_date.to_string(),
    }))
}

pub fn reminder_row(user_id: &str, draft: &ReminderDraft, created_at: DateTime<Utc>) -> Row {
    let mut row = reminder_fields(draft);
    row.insert("user_id".into(), Value::from(user_id));
    row.insert("created_at".into(), encode_timestamp(created_at));
    row.insert("is_completed".into(), encode_flag(false));
    row
}

pub fn completion_patch(completed: bool) -> Row {
    let mut row = Row::new();
    row.insert("is_completed".into(), encode_flag(completed));
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_use_text_literals() {
        assert_eq!(encode_flag(true), json!("true"));
        assert_eq!(encode_flag(false), json!("false"));
        assert!(decode_flag(&json!("true")).unwrap());
        assert!(!decode_flag(&json!("false")).unwrap());
        assert!(decode_flag(&json!("TRUE")).is_err());
        assert!(decode_flag(&json!(1)).is_err());
    }

    #[test]
    fn stored_type_is_lowercase() {
        let draft = TransactionDraft {
            title: "Salary".into(),
            amount: Decimal::new(1000, 0),
            category: "Work".into(),
            tx_type: TxType::Income,
            account: "Cash".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            description: String::new(),
        };
        let row = transaction_fields(&draft);
        assert_eq!(row["type"], json!("income"));
        assert_eq!(row["amount"], json!("1000"));
    }

    #[test]
    fn balance_accepts_numeric_amounts() {
        let row = object(json!({"user_id": "u", "amount": 12.5, "version": 3}));
        let bal = balance_from_row(&row).unwrap();
        assert_eq!(bal.amount, Decimal::new(125, 1));
        assert_eq!(bal.version, 3);
    }
}
