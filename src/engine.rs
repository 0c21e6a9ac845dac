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

//! Ledger transaction engine.
//!
//! The [`Engine`] is the central component that turns requested transfers,
//! deposits, and withdrawals into atomically committed transactions with
//! balanced debit/credit entry pairs.
//!
//! # Processing
//!
//! - **Deposits**: credit a destination account, balanced by a debit on
//!   the system vault account.
//! - **Withdrawals**: debit a source account, balanced by a credit on the
//!   vault; requires sufficient derived balance.
//! - **Transfers**: debit source, credit destination; requires matching
//!   currencies and sufficient balance.
//!
//! # Thread safety
//!
//! All operations take `&self` and may run concurrently. Debit paths hold
//! the source account's exclusive lock across the funds check and the
//! commit, so concurrent debits can never jointly overdraw an account.
//! Transfers lock both accounts in ascending id order.

use crate::account::Account;
use crate::balance::{self, BalanceTotals};
use crate::base::AccountId;
use crate::entry::LedgerEntry;
use crate::error::LedgerError;
use crate::idempotency::IdempotencyGuard;
use crate::locks::AccountLocks;
use crate::store::{LedgerStore, MemoryStore};
use crate::transaction::{
    CompletedTransaction, Transaction, TransactionKind, TransactionRequest,
};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Well-known name of the system clearing account that balances external
/// cash inflows and outflows.
pub const VAULT_ACCOUNT_NAME: &str = "SYSTEM_VAULT";

/// Currency the vault account is created with.
const VAULT_CURRENCY: &str = "USD";

/// Bounded retries for transient storage conflicts on the funds-check
/// path. All other failures propagate immediately.
const FUNDS_CHECK_RETRIES: usize = 3;

/// Ledger transaction engine over a durable store.
///
/// # Invariants
///
/// - Every committed transaction's entries sum to zero (debits balance
///   credits); the store refuses anything else.
/// - An idempotency key maps to at most one transaction, enforced by the
///   store's unique constraint at commit time.
/// - A failed request leaves no transaction row and no entries behind.
pub struct Engine<S: LedgerStore = MemoryStore> {
    store: S,
    locks: AccountLocks,
}

impl Engine<MemoryStore> {
    /// Creates an engine over a fresh in-memory store.
    pub fn new() -> Self {
        Engine::with_store(MemoryStore::new())
    }
}

impl Default for Engine<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LedgerStore> Engine<S> {
    /// Creates an engine over an existing store.
    pub fn with_store(store: S) -> Self {
        Engine {
            store,
            locks: AccountLocks::new(),
        }
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // === Account registry ===

    /// Creates a new active account and persists it.
    pub fn create_account(
        &self,
        name: impl Into<String>,
        currency: impl Into<String>,
    ) -> Account {
        let account = Account::new(name, currency);
        self.store.insert_account(account.clone());
        info!(account = %account.id, currency = %account.currency, "account created");
        account
    }

    /// Retrieves an account by id.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccountNotFound`] when no record exists.
    pub fn get_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .account(account_id)
            .ok_or(LedgerError::AccountNotFound)
    }

    /// The system vault account, if any deposit or withdrawal has been
    /// processed yet.
    pub fn vault_account(&self) -> Option<Account> {
        self.store.account_by_name(VAULT_ACCOUNT_NAME)
    }

    // === Read path ===

    /// Derives the account's current balance from its committed entries.
    pub fn balance_of(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        self.get_account(account_id)?;
        Ok(balance::balance_of(&self.store, account_id))
    }

    /// Credit and debit totals for an account from one snapshot.
    pub fn balance_totals_of(&self, account_id: AccountId) -> Result<BalanceTotals, LedgerError> {
        self.get_account(account_id)?;
        Ok(self.store.balance_totals(account_id))
    }

    /// All of an account's entries, ordered by creation time ascending.
    pub fn ledger_entries_of(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.get_account(account_id)?;
        Ok(self.store.entries_of(account_id))
    }

    // === Transaction processing ===

    /// Processes a deposit: credits the destination account, debits the
    /// system vault.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - amount is zero or negative.
    /// - [`LedgerError::MissingParticipant`] - no destination account id.
    /// - [`LedgerError::AccountNotFound`] - destination does not exist.
    /// - [`LedgerError::AccountFrozen`] - destination refuses credits.
    pub fn process_deposit(
        &self,
        request: TransactionRequest,
    ) -> Result<CompletedTransaction, LedgerError> {
        validate_amount(request.amount)?;
        let destination_id = request
            .destination_account_id
            .ok_or(LedgerError::MissingParticipant)?;

        let guard = IdempotencyGuard::new(&self.store);
        if let Some(prior) = guard.lookup(&request.idempotency_key) {
            return Ok(prior);
        }

        let destination = self.get_account(destination_id)?;
        ensure_not_frozen(&destination)?;
        let vault = self
            .store
            .get_or_create_account(VAULT_ACCOUNT_NAME, VAULT_CURRENCY);

        let transaction = Transaction::completed(TransactionKind::Deposit, &request);
        let entries = vec![
            LedgerEntry::credit(transaction.id, destination.id, request.amount),
            LedgerEntry::debit(transaction.id, vault.id, request.amount),
        ];

        match self.store.commit(transaction.clone(), entries.clone()) {
            Ok(()) => {
                info!(
                    transaction = %transaction.id,
                    account = %destination.id,
                    amount = %request.amount,
                    "deposit committed"
                );
                Ok(CompletedTransaction {
                    transaction,
                    entries,
                })
            }
            Err(LedgerError::DuplicateIdempotencyKey) => {
                warn!(key = %request.idempotency_key, "deposit lost idempotency race");
                guard.resolve_race(&request.idempotency_key)
            }
            Err(err) => Err(err),
        }
    }

    /// Processes a withdrawal: debits the source account, credits the
    /// system vault. The funds check and the commit run under the source
    /// account's exclusive lock.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - amount is zero or negative.
    /// - [`LedgerError::MissingParticipant`] - no source account id.
    /// - [`LedgerError::AccountNotFound`] - source does not exist.
    /// - [`LedgerError::AccountFrozen`] - source refuses debits.
    /// - [`LedgerError::InsufficientFunds`] - derived balance below amount.
    pub fn process_withdrawal(
        &self,
        request: TransactionRequest,
    ) -> Result<CompletedTransaction, LedgerError> {
        validate_amount(request.amount)?;
        let source_id = request
            .source_account_id
            .ok_or(LedgerError::MissingParticipant)?;

        let guard = IdempotencyGuard::new(&self.store);
        if let Some(prior) = guard.lookup(&request.idempotency_key) {
            return Ok(prior);
        }

        let source = self.get_account(source_id)?;
        ensure_not_frozen(&source)?;
        let vault = self
            .store
            .get_or_create_account(VAULT_ACCOUNT_NAME, VAULT_CURRENCY);

        let handle = self.locks.handle(source.id);
        let mut attempts = 0;
        loop {
            let _source_lock = handle.lock();

            if balance::balance_of(&self.store, source.id) < request.amount {
                return Err(LedgerError::InsufficientFunds);
            }

            let transaction = Transaction::completed(TransactionKind::Withdrawal, &request);
            let entries = vec![
                LedgerEntry::debit(transaction.id, source.id, request.amount),
                LedgerEntry::credit(transaction.id, vault.id, request.amount),
            ];

            match self.store.commit(transaction.clone(), entries.clone()) {
                Ok(()) => {
                    info!(
                        transaction = %transaction.id,
                        account = %source.id,
                        amount = %request.amount,
                        "withdrawal committed"
                    );
                    return Ok(CompletedTransaction {
                        transaction,
                        entries,
                    });
                }
                Err(LedgerError::DuplicateIdempotencyKey) => {
                    warn!(key = %request.idempotency_key, "withdrawal lost idempotency race");
                    return guard.resolve_race(&request.idempotency_key);
                }
                Err(err) if err.is_retryable() && attempts < FUNDS_CHECK_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Processes a transfer between two accounts of the same currency.
    /// Both account locks are held, in ascending id order, across the
    /// funds check and the commit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - amount is zero or negative.
    /// - [`LedgerError::MissingParticipant`] - source or destination absent.
    /// - [`LedgerError::AccountNotFound`] - either account does not exist.
    /// - [`LedgerError::AccountFrozen`] - either account is frozen.
    /// - [`LedgerError::CurrencyMismatch`] - differing currencies.
    /// - [`LedgerError::InsufficientFunds`] - source balance below amount.
    pub fn process_transfer(
        &self,
        request: TransactionRequest,
    ) -> Result<CompletedTransaction, LedgerError> {
        validate_amount(request.amount)?;
        let source_id = request
            .source_account_id
            .ok_or(LedgerError::MissingParticipant)?;
        let destination_id = request
            .destination_account_id
            .ok_or(LedgerError::MissingParticipant)?;

        let guard = IdempotencyGuard::new(&self.store);
        if let Some(prior) = guard.lookup(&request.idempotency_key) {
            return Ok(prior);
        }

        let source = self.get_account(source_id)?;
        let destination = self.get_account(destination_id)?;
        ensure_not_frozen(&source)?;
        ensure_not_frozen(&destination)?;
        if source.currency != destination.currency {
            return Err(LedgerError::CurrencyMismatch);
        }

        let (first, second) = self.locks.ordered_pair(source.id, destination.id);
        let mut attempts = 0;
        loop {
            let _first_lock = first.lock();
            let _second_lock = second.as_ref().map(|handle| handle.lock());

            if balance::balance_of(&self.store, source.id) < request.amount {
                return Err(LedgerError::InsufficientFunds);
            }

            let transaction = Transaction::completed(TransactionKind::Transfer, &request);
            let entries = vec![
                LedgerEntry::debit(transaction.id, source.id, request.amount),
                LedgerEntry::credit(transaction.id, destination.id, request.amount),
            ];

            match self.store.commit(transaction.clone(), entries.clone()) {
                Ok(()) => {
                    info!(
                        transaction = %transaction.id,
                        source = %source.id,
                        destination = %destination.id,
                        amount = %request.amount,
                        "transfer committed"
                    );
                    return Ok(CompletedTransaction {
                        transaction,
                        entries,
                    });
                }
                Err(LedgerError::DuplicateIdempotencyKey) => {
                    warn!(key = %request.idempotency_key, "transfer lost idempotency race");
                    return guard.resolve_race(&request.idempotency_key);
                }
                Err(err) if err.is_retryable() && attempts < FUNDS_CHECK_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}

fn ensure_not_frozen(account: &Account) -> Result<(), LedgerError> {
    if account.is_frozen() {
        return Err(LedgerError::AccountFrozen);
    }
    Ok(())
}
