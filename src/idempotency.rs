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

//! Idempotency guard.
//!
//! Maps an idempotency key to a prior transaction outcome so a retried
//! request returns the original result instead of reprocessing. The guard
//! wraps all three engine operations; its source of truth is the store's
//! unique constraint on the key, checked atomically inside
//! [`LedgerStore::commit`]. The lookup here is only a fast path — two
//! requests carrying the same fresh key can both pass it, and the commit
//! constraint elects the single winner.

use crate::error::LedgerError;
use crate::store::LedgerStore;
use crate::transaction::CompletedTransaction;

/// Fast-path lookup plus duplicate-key race resolution over a store.
pub struct IdempotencyGuard<'a, S: LedgerStore> {
    store: &'a S,
}

impl<'a, S: LedgerStore> IdempotencyGuard<'a, S> {
    pub fn new(store: &'a S) -> Self {
        IdempotencyGuard { store }
    }

    /// Returns the previously committed transaction for this key, with
    /// its entries, if the key has been seen.
    pub fn lookup(&self, idempotency_key: &str) -> Option<CompletedTransaction> {
        self.store.transaction_by_key(idempotency_key)
    }

    /// Resolves a [`LedgerError::DuplicateIdempotencyKey`] commit failure
    /// by fetching the transaction that won the key.
    ///
    /// The winner committed before our reservation failed, so it must be
    /// readable; if the store cannot produce it the conflict is treated
    /// as transient and surfaced as retryable.
    pub fn resolve_race(&self, idempotency_key: &str) -> Result<CompletedTransaction, LedgerError> {
        self.store
            .transaction_by_key(idempotency_key)
            .ok_or(LedgerError::StorageConflict)
    }
}
