// SPDX-License-Identifier: AGPL-3.0-or-later
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Ledger entries: the fundamental unit of the double-entry system.
//!
//! Every economic event is recorded as a balanced set of opposing entries.
//! Credits increase an account's derived balance, debits decrease it.

use crate::base::{AccountId, EntryId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryDirection {
    Debit,
    Credit,
}

/// A single debit or credit against an account.
///
/// Entries are owned by their transaction: they are written in the same
/// atomic unit as the transaction row and can never be reassigned.
/// `amount` is always positive; the direction carries the sign.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    const DECIMAL_PRECISION: u32 = 4;

    pub fn debit(transaction_id: TransactionId, account_id: AccountId, amount: Decimal) -> Self {
        Self::new(transaction_id, account_id, EntryDirection::Debit, amount)
    }

    pub fn credit(transaction_id: TransactionId, account_id: AccountId, amount: Decimal) -> Self {
        Self::new(transaction_id, account_id, EntryDirection::Credit, amount)
    }

    fn new(
        transaction_id: TransactionId,
        account_id: AccountId,
        direction: EntryDirection,
        amount: Decimal,
    ) -> Self {
        LedgerEntry {
            id: EntryId::new(),
            transaction_id,
            account_id,
            direction,
            amount,
            created_at: Utc::now(),
        }
    }

    /// The entry's contribution to its account's balance: positive for
    /// credits, negative for debits.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            EntryDirection::Credit => self.amount,
            EntryDirection::Debit => -self.amount,
        }
    }
}

impl Serialize for LedgerEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("LedgerEntry", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("transaction_id", &self.transaction_id)?;
        state.serialize_field("account_id", &self.account_id)?;
        state.serialize_field("direction", &self.direction)?;
        state.serialize_field(
            "amount",
            &self.amount.round_dp(LedgerEntry::DECIMAL_PRECISION),
        )?;
        state.serialize_field("created_at", &self.created_at)?;
        state.end()
    }
}

/// Checks the ledger's core correctness property for one transaction's
/// entry set: total credits equal total debits, and every amount is
/// strictly positive.
pub fn entries_are_balanced(entries: &[LedgerEntry]) -> bool {
    if entries.is_empty() || entries.iter().any(|e| e.amount <= Decimal::ZERO) {
        return false;
    }
    let net: Decimal = entries.iter().map(LedgerEntry::signed_amount).sum();
    net == Decimal::ZERO
}
