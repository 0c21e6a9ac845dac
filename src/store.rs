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

//! Durable storage seam for the ledger.
//!
//! [`LedgerStore`] is the contract the engine is written against: a
//! table-like store offering atomic multi-row commit, unique-constraint
//! enforcement on idempotency keys and well-known account names, and
//! snapshot-consistent aggregate reads.
//!
//! [`MemoryStore`] is the in-process implementation. Accounts and
//! transactions live in [`DashMap`] tables; entries live in an append-only
//! journal behind a [`RwLock`], so a commit is one short write-locked
//! critical section and every read sees a consistent snapshot.

use crate::balance::BalanceTotals;
use crate::base::{AccountId, TransactionId};
use crate::entry::{entries_are_balanced, EntryDirection, LedgerEntry};
use crate::error::LedgerError;
use crate::transaction::{CompletedTransaction, Transaction};
use crate::Account;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

/// Storage contract the transaction engine is written against.
///
/// Implementations must guarantee:
///
/// - `commit` is atomic: the transaction row and all its entries become
///   visible together, or not at all.
/// - `commit` enforces idempotency-key uniqueness itself, returning
///   [`LedgerError::DuplicateIdempotencyKey`] to the losing writer. The
///   engine's pre-check is only a fast path.
/// - `get_or_create_account` is an atomic insert-if-absent keyed on the
///   unique account name; concurrent callers observe one account.
/// - `balance_totals` reads both sums from a single snapshot.
pub trait LedgerStore: Send + Sync {
    /// Persists a new account record.
    fn insert_account(&self, account: Account);

    /// Reads an account by id.
    fn account(&self, id: AccountId) -> Option<Account>;

    /// Reads an account by its well-known name.
    fn account_by_name(&self, name: &str) -> Option<Account>;

    /// Returns the account with the given unique name, creating it
    /// exactly once under contention.
    fn get_or_create_account(&self, name: &str, currency: &str) -> Account;

    /// Reads a transaction by id, with its entries in creation order.
    fn transaction(&self, id: TransactionId) -> Option<CompletedTransaction>;

    /// Reads a previously committed transaction by idempotency key, with
    /// its entries in creation order.
    fn transaction_by_key(&self, idempotency_key: &str) -> Option<CompletedTransaction>;

    /// Atomically persists a transaction row and its balanced entry set.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnbalancedEntries`] if the entry set does not sum
    ///   to zero; nothing is persisted.
    /// - [`LedgerError::DuplicateIdempotencyKey`] if another transaction
    ///   holds the key; nothing is persisted.
    /// - [`LedgerError::StorageConflict`] on a transient conflict the
    ///   caller may retry.
    fn commit(&self, transaction: Transaction, entries: Vec<LedgerEntry>)
        -> Result<(), LedgerError>;

    /// All entries for an account, ordered by creation time ascending.
    fn entries_of(&self, account_id: AccountId) -> Vec<LedgerEntry>;

    /// Credit and debit sums for an account from one consistent snapshot.
    fn balance_totals(&self, account_id: AccountId) -> BalanceTotals;
}

/// In-memory ledger store.
///
/// The entry journal is append-only: entries are only ever added, in the
/// same write-locked section that publishes their transaction, so readers
/// holding the read lock see either all of a transaction's rows or none.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Account records indexed by id.
    accounts: DashMap<AccountId, Account>,
    /// Unique well-known name index used for vault provisioning.
    names: DashMap<String, AccountId>,
    /// Committed transaction rows indexed by id.
    transactions: DashMap<TransactionId, Transaction>,
    /// Idempotency key -> transaction id. The entry API makes reservation
    /// an atomic check-and-insert.
    idempotency: DashMap<String, TransactionId>,
    /// Append-only entry journal in commit order.
    journal: RwLock<Vec<LedgerEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries_of_transaction(
        journal: &[LedgerEntry],
        transaction_id: TransactionId,
    ) -> Vec<LedgerEntry> {
        journal
            .iter()
            .filter(|entry| entry.transaction_id == transaction_id)
            .cloned()
            .collect()
    }
}

impl LedgerStore for MemoryStore {
    fn insert_account(&self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    fn account(&self, id: AccountId) -> Option<Account> {
        self.accounts.get(&id).map(|account| account.clone())
    }

    fn account_by_name(&self, name: &str) -> Option<Account> {
        let id = *self.names.get(name)?;
        self.account(id)
    }

    fn get_or_create_account(&self, name: &str, currency: &str) -> Account {
        // The entry API serializes concurrent creators on the name key,
        // so exactly one account row is ever created per name.
        match self.names.entry(name.to_string()) {
            Entry::Occupied(slot) => self
                .account(*slot.get())
                .expect("name index references a missing account"),
            Entry::Vacant(slot) => {
                let account = Account::new(name, currency);
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                account
            }
        }
    }

    fn transaction(&self, id: TransactionId) -> Option<CompletedTransaction> {
        let transaction = self.transactions.get(&id)?.clone();
        let journal = self.journal.read();
        let entries = Self::entries_of_transaction(&journal, id);
        Some(CompletedTransaction {
            transaction,
            entries,
        })
    }

    fn transaction_by_key(&self, idempotency_key: &str) -> Option<CompletedTransaction> {
        let id = *self.idempotency.get(idempotency_key)?;
        self.transaction(id)
    }

    fn commit(
        &self,
        transaction: Transaction,
        entries: Vec<LedgerEntry>,
    ) -> Result<(), LedgerError> {
        if !entries_are_balanced(&entries) {
            return Err(LedgerError::UnbalancedEntries);
        }

        // Hold the journal write lock across key reservation and entry
        // append: a reader that finds the key must then wait on the
        // journal and will observe the complete entry set.
        let mut journal = self.journal.write();
        match self.idempotency.entry(transaction.idempotency_key.clone()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateIdempotencyKey),
            Entry::Vacant(slot) => {
                // Transaction row first, then the key that publishes it.
                self.transactions.insert(transaction.id, transaction.clone());
                slot.insert(transaction.id);
                journal.extend(entries);
                Ok(())
            }
        }
    }

    fn entries_of(&self, account_id: AccountId) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self
            .journal
            .read()
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect();
        // Entries are stamped before the commit lock, so journal order can
        // disagree with timestamp order when commits race. Stable sort:
        // journal order breaks timestamp ties.
        entries.sort_by_key(|entry| entry.created_at);
        entries
    }

    fn balance_totals(&self, account_id: AccountId) -> BalanceTotals {
        let journal = self.journal.read();
        let mut totals = BalanceTotals::default();
        for entry in journal.iter().filter(|e| e.account_id == account_id) {
            match entry.direction {
                EntryDirection::Credit => totals.credits += entry.amount,
                EntryDirection::Debit => totals.debits += entry.amount,
            }
        }
        totals
    }
}
