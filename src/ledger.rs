// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction ledger and the running balance derived from it.
//!
//! Invariant: a user's `BalanceTbl.amount` equals the sum of `+amount` for
//! income and `-amount` for expense over that user's `TransactionTbl` rows.
//! Append, edit and delete each read the balance, write the ledger row, then
//! write the adjusted balance. There is no multi-statement transaction: if
//! the balance write fails after the ledger write, the error is returned and
//! [`Ledger::reconcile`] repairs the drift.

use chrono::Utc;
use log::{error, info, warn};
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::models::{
    Audit, Balance, Posted, Transaction, TransactionDraft, TransactionEdit, TxType,
};
use crate::session::SessionGate;
use crate::store::{codec, select_one, Filter, Store, Table};

/// Parse a user-entered amount: finite, non-negative decimal.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let s = s.trim();
    let d = s
        .parse::<Decimal>()
        .map_err(|_| Error::invalid(format!("amount '{}' is not a finite number", s)))?;
    if d.is_sign_negative() && !d.is_zero() {
        return Err(Error::invalid(format!("amount '{}' must not be negative", s)));
    }
    Ok(d.abs())
}

fn validate(draft: &TransactionDraft) -> Result<TransactionDraft> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(Error::invalid("transaction title must not be empty"));
    }
    if draft.amount.is_sign_negative() && !draft.amount.is_zero() {
        return Err(Error::invalid(format!(
            "amount {} must not be negative",
            draft.amount
        )));
    }
    Ok(TransactionDraft {
        title: title.to_string(),
        amount: draft.amount.abs(),
        category: draft.category.trim().to_string(),
        tx_type: draft.tx_type,
        account: draft.account.trim().to_string(),
        date: draft.date,
        description: draft.description.trim().to_string(),
    })
}

fn parse_edit(edit: &TransactionEdit) -> Result<TransactionDraft> {
    let amount = parse_amount(&edit.amount)?;
    let tx_type = edit.tx_type.parse::<TxType>()?;
    validate(&TransactionDraft {
        title: edit.title.clone(),
        amount,
        category: edit.category.clone(),
        tx_type,
        account: edit.account.clone(),
        date: edit.date,
        description: edit.description.clone(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

pub struct Ledger<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> Ledger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn balance(&self, gate: &SessionGate) -> Result<Balance> {
        let uid = gate.user_id()?;
        self.read_balance(uid)
    }

    pub fn get(&self, gate: &SessionGate, id: i64) -> Result<Transaction> {
        let uid = gate.user_id()?;
        self.find(uid, id)
    }

    /// Newest first (by id). Search is a case-insensitive substring match over
    /// the displayed fields.
    pub fn list(&self, gate: &SessionGate, query: &ListQuery) -> Result<Vec<Transaction>> {
        let uid = gate.user_id()?;
        let mut filter = Filter::new().eq("user_id", uid).order("id", false);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if search.is_none() {
            if let Some(n) = query.limit {
                filter = filter.limit(n);
            }
        }
        let rows = self.store.select(Table::Transactions, &filter)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let tx = codec::transaction_from_row(row)?;
            if search.map(|q| tx.matches(q)).unwrap_or(true) {
                out.push(tx);
            }
        }
        if let Some(n) = query.limit {
            out.truncate(n);
        }
        Ok(out)
    }

    pub fn append(&self, gate: &SessionGate, draft: &TransactionDraft) -> Result<Posted> {
        let uid = gate.user_id()?;
        let draft = validate(draft)?;
        let balance = self.read_balance(uid)?;
        let target = shift(balance.amount, draft.tx_type.effect(draft.amount))?;
        let row = self.store.insert(
            Table::Transactions,
            codec::transaction_row(uid, &draft, Utc::now()),
        )?;
        let transaction = codec::transaction_from_row(&row)?;
        let balance = self.settle(&balance, target, "append", transaction.id)?;
        info!(
            "appended {} {} '{}' (#{}); balance {}",
            transaction.tx_type,
            transaction.amount,
            transaction.title,
            transaction.id,
            balance.amount
        );
        Ok(Posted {
            transaction,
            balance,
        })
    }

    pub fn edit(&self, gate: &SessionGate, id: i64, edit: &TransactionEdit) -> Result<Posted> {
        let uid = gate.user_id()?;
        let draft = parse_edit(edit)?;

        let balance = self.read_balance(uid)?;
        let old = self.find(uid, id)?;
        let reverted = shift(balance.amount, -old.effect())?;
        let target = shift(reverted, draft.tx_type.effect(draft.amount))?;

        let rows = self.store.update(
            Table::Transactions,
            codec::transaction_fields(&draft),
            &owned(uid, id),
        )?;
        let row = rows
            .first()
            .ok_or_else(|| Error::not_found(format!("transaction {}", id)))?;
        let transaction = codec::transaction_from_row(row)?;
        let balance = self.settle(&balance, target, "edit", id)?;
        info!(
            "edited #{}: {} {} -> {} {}; balance {}",
            id, old.tx_type, old.amount, transaction.tx_type, transaction.amount, balance.amount
        );
        Ok(Posted {
            transaction,
            balance,
        })
    }

    pub fn delete(&self, gate: &SessionGate, id: i64) -> Result<Balance> {
        let uid = gate.user_id()?;
        let balance = self.read_balance(uid)?;
        let old = self.find(uid, id)?;
        let target = shift(balance.amount, -old.effect())?;
        let removed = self.store.delete(Table::Transactions, &owned(uid, id))?;
        if removed == 0 {
            return Err(Error::not_found(format!("transaction {}", id)));
        }
        let balance = self.settle(&balance, target, "delete", id)?;
        info!(
            "deleted #{} ({} {}); balance {}",
            id, old.tx_type, old.amount, balance.amount
        );
        Ok(balance)
    }

    /// Compare the stored balance with the ledger's signed sum.
    pub fn audit(&self, gate: &SessionGate) -> Result<Audit> {
        let uid = gate.user_id()?;
        let (balance, audit) = self.measure(uid)?;
        if !audit.is_consistent() {
            warn!(
                "balance for {} drifted by {} (stored {}, ledger {})",
                balance.user_id,
                audit.drift(),
                audit.stored,
                audit.computed
            );
        }
        Ok(audit)
    }

    /// Overwrite the stored balance with the ledger's signed sum.
    pub fn reconcile(&self, gate: &SessionGate) -> Result<Balance> {
        let uid = gate.user_id()?;
        let (balance, audit) = self.measure(uid)?;
        if audit.is_consistent() {
            return Ok(balance);
        }
        let fixed = self.write_balance(&balance, audit.computed)?;
        info!(
            "reconciled balance for {}: {} -> {}",
            uid, audit.stored, fixed.amount
        );
        Ok(fixed)
    }

    fn measure(&self, uid: &str) -> Result<(Balance, Audit)> {
        let balance = self.read_balance(uid)?;
        let rows = self
            .store
            .select(Table::Transactions, &Filter::new().eq("user_id", uid))?;
        let mut computed = Decimal::ZERO;
        for row in &rows {
            let tx = codec::transaction_from_row(row)?;
            computed = computed.checked_add(tx.effect()).ok_or_else(|| {
                Error::persistence(format!(
                    "ledger sum for {} overflows at transaction #{}",
                    uid, tx.id
                ))
            })?;
        }
        let audit = Audit {
            stored: balance.amount,
            computed,
            transactions: rows.len(),
        };
        Ok((balance, audit))
    }

    fn read_balance(&self, uid: &str) -> Result<Balance> {
        let row = select_one(self.store, Table::Balance, &Filter::new().eq("user_id", uid))?
            .ok_or_else(|| Error::not_found(format!("balance record for user {}", uid)))?;
        codec::balance_from_row(&row)
    }

    fn find(&self, uid: &str, id: i64) -> Result<Transaction> {
        let row = select_one(self.store, Table::Transactions, &owned(uid, id))?
            .ok_or_else(|| Error::not_found(format!("transaction {}", id)))?;
        codec::transaction_from_row(&row)
    }

    /// Conditional on the version that was read; a concurrent writer makes
    /// this fail with `Conflict` instead of silently overwriting.
    fn write_balance(&self, current: &Balance, amount: Decimal) -> Result<Balance> {
        let filter = Filter::new()
            .eq("user_id", current.user_id.as_str())
            .eq("version", current.version);
        let rows = self.store.update(
            Table::Balance,
            codec::balance_patch(amount, current.version + 1),
            &filter,
        )?;
        match rows.first() {
            Some(row) => codec::balance_from_row(row),
            None => Err(Error::Conflict(format!(
                "balance for {} changed since version {}",
                current.user_id, current.version
            ))),
        }
    }

    fn settle(&self, current: &Balance, amount: Decimal, op: &str, id: i64) -> Result<Balance> {
        self.write_balance(current, amount).map_err(|e| {
            error!(
                "{} of transaction #{} was written but the balance was not ({}); \
                 ledger and balance now disagree until `billfold balance reconcile`",
                op, id, e
            );
            e
        })
    }
}

/// New balance after applying `delta`, refused when it would not fit in a `Decimal`.
fn shift(current: Decimal, delta: Decimal) -> Result<Decimal> {
    current.checked_add(delta).ok_or_else(|| {
        Error::invalid(format!(
            "balance {} cannot absorb {} without overflowing",
            current, delta
        ))
    })
}

fn owned(uid: &str, id: i64) -> Filter {
    Filter::new().eq("id", id).eq("user_id", uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_rejects_garbage() {
        assert!(matches!(parse_amount("abc"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_amount("-5"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_amount("NaN"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_amount("inf"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_amount(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn shift_refuses_overflow() {
        assert_eq!(shift(Decimal::ONE, -Decimal::TWO).unwrap(), -Decimal::ONE);
        assert!(matches!(
            shift(Decimal::MAX, Decimal::ONE),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            shift(Decimal::MIN, -Decimal::ONE),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn parse_amount_accepts_decimals() {
        assert_eq!(parse_amount(" 12.50 ").unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_amount("0").unwrap(), Decimal::ZERO);
    }
}
