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

//! Error types for ledger transaction processing.
//!
//! None of these carry transport-specific codes; translating to protocol
//! status codes is a boundary concern.

use thiserror::Error;

/// Ledger transaction processing errors.
///
/// Every failure leaves the ledger untouched: no transaction row, no
/// entries, no balance change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative.
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Required source/destination account id is absent for the
    /// requested transaction kind.
    #[error("missing source or destination account for this transaction")]
    MissingParticipant,

    /// Referenced account id has no record.
    #[error("account not found")]
    AccountNotFound,

    /// Referenced account is frozen and cannot be debited or credited.
    #[error("account is frozen")]
    AccountFrozen,

    /// Transfer between accounts of differing currency.
    #[error("currency mismatch between accounts")]
    CurrencyMismatch,

    /// Debiting account's derived balance is below the requested amount.
    #[error("insufficient available funds")]
    InsufficientFunds,

    /// Another transaction already holds this idempotency key.
    ///
    /// Internal race signal: the engine always resolves it by returning
    /// the winning transaction, so callers never observe this variant.
    #[error("duplicate idempotency key")]
    DuplicateIdempotencyKey,

    /// Entry set does not sum to zero (total debits != total credits).
    ///
    /// Raised by the store as a last-line guard; unreachable through the
    /// engine's public operations, which only construct balanced pairs.
    #[error("transaction entries are not balanced")]
    UnbalancedEntries,

    /// Transient storage-layer conflict (lock conflict, timeout).
    ///
    /// Retryable: the engine retries the funds-check path a bounded
    /// number of times before propagating.
    #[error("transient storage conflict")]
    StorageConflict,
}

impl LedgerError {
    /// Whether the operation may be retried without caller involvement.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StorageConflict)
    }
}
