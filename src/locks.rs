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

//! Per-account exclusive locks.
//!
//! A funds check and the entry write it authorizes must happen under one
//! exclusive lock on the debited account, otherwise two concurrent debits
//! can both read the same pre-debit balance and overdraw together. Lock
//! scope is per-account: unrelated accounts never serialize against each
//! other. Two-account operations acquire their locks in ascending
//! [`AccountId`] order so opposite-direction transfers between the same
//! pair cannot deadlock.

use crate::base::AccountId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Registry of one mutex per account, created on first use.
#[derive(Debug, Default)]
pub(crate) struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lock handle for a single account.
    pub(crate) fn handle(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_default().clone()
    }

    /// Lock handles for a pair of accounts in deterministic (ascending
    /// id) acquisition order. Returns one handle when both ids are the
    /// same account, so callers never lock a mutex twice.
    pub(crate) fn ordered_pair(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> (Arc<Mutex<()>>, Option<Arc<Mutex<()>>>) {
        if a == b {
            return (self.handle(a), None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        (self.handle(first), Some(self.handle(second)))
    }
}
