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

//! Balance derivation.
//!
//! An account's balance is never stored. It is a pure fold over the
//! account's committed entries: sum of credits minus sum of debits,
//! independent of entry order. Keeping a single source of truth means no
//! counter can ever drift from the journal.

use crate::base::AccountId;
use crate::entry::LedgerEntry;
use crate::store::LedgerStore;
use rust_decimal::Decimal;

/// Credit and debit sums for one account, taken from one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceTotals {
    pub credits: Decimal,
    pub debits: Decimal,
}

impl BalanceTotals {
    /// Derived balance: credits increase it, debits decrease it.
    pub fn net(&self) -> Decimal {
        self.credits - self.debits
    }
}

/// Derives the current balance of an account.
///
/// Both aggregate sums come from a single store snapshot; when the caller
/// holds the account's exclusive lock (the debit paths do), the value
/// stays valid through the subsequent write.
pub fn balance_of<S: LedgerStore>(store: &S, account_id: AccountId) -> Decimal {
    store.balance_totals(account_id).net()
}

/// Folds raw entries into a net balance.
///
/// Used by invariant checks to recompute balances independently of the
/// store's aggregates.
pub fn net_of_entries(entries: &[LedgerEntry]) -> Decimal {
    entries.iter().map(LedgerEntry::signed_amount).sum()
}
