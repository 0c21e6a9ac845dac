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

//! # Ledger Engine
//!
//! A double-entry financial ledger: accounts, balanced debit/credit
//! entries, and the transactions (transfer, deposit, withdrawal) that
//! produce them. The engine creates balanced entry pairs atomically,
//! enforces idempotency keys, validates currency and sufficient-funds
//! constraints, and guarantees concurrent requests can never unbalance
//! the ledger or double-spend.
//!
//! ## Core components
//!
//! - [`Engine`]: transaction processor over a [`LedgerStore`]
//! - [`Account`]: account metadata; balances are always derived
//! - [`LedgerEntry`]: one debit or credit, owned by its transaction
//! - [`TransactionRequest`] / [`CompletedTransaction`]: input and output
//!   shapes of the three operations
//! - [`LedgerError`]: failure kinds, all leaving the ledger untouched
//!
//! ## Example
//!
//! ```
//! use ledger_engine_rs::{Engine, TransactionRequest};
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::new();
//! let account = engine.create_account("alice", "USD");
//!
//! let deposit = TransactionRequest::deposit(account.id, dec!(500.00), "dep-1");
//! let committed = engine.process_deposit(deposit).unwrap();
//!
//! assert_eq!(committed.entries.len(), 2);
//! assert_eq!(engine.balance_of(account.id).unwrap(), dec!(500.00));
//! ```
//!
//! ## Thread safety
//!
//! All engine operations take `&self`. Funds checks and entry writes run
//! under per-account exclusive locks; idempotency keys are claimed by an
//! atomic unique-constraint check at commit time.

pub mod account;
pub mod balance;
mod base;
mod engine;
pub mod entry;
pub mod error;
pub mod idempotency;
mod locks;
pub mod store;
pub mod transaction;

pub use account::{Account, AccountStatus};
pub use balance::BalanceTotals;
pub use base::{AccountId, EntryId, TransactionId};
pub use engine::{Engine, VAULT_ACCOUNT_NAME};
pub use entry::{EntryDirection, LedgerEntry};
pub use error::LedgerError;
pub use idempotency::IdempotencyGuard;
pub use store::{LedgerStore, MemoryStore};
pub use transaction::{
    CompletedTransaction, Transaction, TransactionKind, TransactionRequest, TransactionStatus,
};
