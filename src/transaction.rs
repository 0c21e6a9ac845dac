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

//! Transaction records and request shapes.
//!
//! A transaction is an atomic financial event. Per request it moves
//! `RECEIVED → IDEMPOTENCY_CHECKED → VALIDATED → ENTRIES_WRITTEN →
//! COMMITTED`; any failure aborts the whole unit, so the only status a
//! caller ever observes on a persisted transaction is [`Completed`].
//!
//! [`Completed`]: TransactionStatus::Completed

use crate::base::{AccountId, TransactionId};
use crate::entry::LedgerEntry;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of financial event a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Transfer,
    Deposit,
    Withdrawal,
}

/// Transaction lifecycle status.
///
/// `Completed` and `Failed` are terminal. `Pending` exists only inside an
/// uncommitted unit of work and is never visible past the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// A committed financial event.
///
/// Exclusively owns its ledger entries: the entries are written in the
/// same atomic unit and cannot outlive or be reassigned from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub description: Option<String>,
    /// Opaque caller-supplied key-value mapping.
    pub metadata: Option<serde_json::Value>,
    /// Caller-supplied token; unique across all transactions.
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a completed transaction from a validated request.
    ///
    /// The record is created directly in `Completed` status: it only
    /// becomes durable if the surrounding commit succeeds, so a pending
    /// state is never observable.
    pub fn completed(kind: TransactionKind, request: &TransactionRequest) -> Self {
        Transaction {
            id: TransactionId::new(),
            kind,
            status: TransactionStatus::Completed,
            description: request.description.clone(),
            metadata: request.metadata.clone(),
            idempotency_key: request.idempotency_key.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Validated input for the three engine operations.
///
/// The request boundary supplies typed fields; the engine still
/// re-validates business rules (amount positivity, participant presence,
/// account existence) because boundary validation is not a correctness
/// guarantee for the ledger invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub amount: Decimal,
    pub source_account_id: Option<AccountId>,
    pub destination_account_id: Option<AccountId>,
    pub idempotency_key: String,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TransactionRequest {
    /// Request crediting `destination` from the system vault.
    pub fn deposit(
        destination: AccountId,
        amount: Decimal,
        idempotency_key: impl Into<String>,
    ) -> Self {
        TransactionRequest {
            amount,
            source_account_id: None,
            destination_account_id: Some(destination),
            idempotency_key: idempotency_key.into(),
            description: None,
            metadata: None,
        }
    }

    /// Request debiting `source` into the system vault.
    pub fn withdrawal(
        source: AccountId,
        amount: Decimal,
        idempotency_key: impl Into<String>,
    ) -> Self {
        TransactionRequest {
            amount,
            source_account_id: Some(source),
            destination_account_id: None,
            idempotency_key: idempotency_key.into(),
            description: None,
            metadata: None,
        }
    }

    /// Request moving funds from `source` to `destination`.
    pub fn transfer(
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        idempotency_key: impl Into<String>,
    ) -> Self {
        TransactionRequest {
            amount,
            source_account_id: Some(source),
            destination_account_id: Some(destination),
            idempotency_key: idempotency_key.into(),
            description: None,
            metadata: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A committed transaction together with its entries, ordered by creation
/// time. This is the shape returned upward to the request boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub entries: Vec<LedgerEntry>,
}

impl CompletedTransaction {
    pub fn id(&self) -> TransactionId {
        self.transaction.id
    }
}
