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

//! Account records.
//!
//! An account is pure metadata: identity, display name, currency, and
//! status. Its balance is never stored here — it is always derived by
//! folding over the account's committed ledger entries (see
//! [`crate::balance`]).

use crate::base::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account lifecycle status.
///
/// Frozen accounts refuse both debit and credit participation. The engine
/// never transitions status itself; freezing happens externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Active,
    Frozen,
}

/// A ledger account.
///
/// # Invariants
///
/// - `currency` is immutable after creation; there is no migration path.
/// - Accounts are never deleted; entries referencing them stay valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// ISO-4217-like currency code, e.g. "USD".
    pub currency: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new active account with a fresh identity.
    pub fn new(name: impl Into<String>, currency: impl Into<String>) -> Self {
        Account {
            id: AccountId::new(),
            name: name.into(),
            currency: currency.into(),
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.status == AccountStatus::Frozen
    }
}
