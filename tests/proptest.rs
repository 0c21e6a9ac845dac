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

//! Property-based tests for the ledger engine.
//!
//! These tests verify invariants that should hold for any sequence of
//! valid transactions.

use ledger_engine_rs::{
    balance::net_of_entries, entry::entries_are_balanced, Engine, LedgerError, TransactionRequest,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive amount (0.0001 to 1000 with 4 decimal places).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000_000i64).prop_map(|cents| Decimal::new(cents, 4))
}

/// One step of a random single-account workload.
#[derive(Debug, Clone)]
enum Op {
    Deposit(Decimal),
    Withdrawal(Decimal),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_amount().prop_map(Op::Deposit),
        arb_amount().prop_map(Op::Withdrawal),
    ]
}

// =============================================================================
// Balance Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// A balance always equals an independent fold over the account's
    /// own entries, whatever mix of operations ran before.
    #[test]
    fn balance_matches_entry_fold(
        ops in prop::collection::vec(arb_op(), 1..30),
    ) {
        let engine = Engine::new();
        let account = engine.create_account("alice", "USD");

        for (i, op) in ops.iter().enumerate() {
            let key = format!("k-{i}");
            let _ = match op {
                Op::Deposit(amount) => engine
                    .process_deposit(TransactionRequest::deposit(account.id, *amount, key)),
                Op::Withdrawal(amount) => engine
                    .process_withdrawal(TransactionRequest::withdrawal(account.id, *amount, key)),
            };
        }

        let entries = engine.ledger_entries_of(account.id).unwrap();
        prop_assert_eq!(
            engine.balance_of(account.id).unwrap(),
            net_of_entries(&entries)
        );
    }

    /// Balances never go negative, whatever the workload.
    #[test]
    fn balance_never_negative(
        ops in prop::collection::vec(arb_op(), 1..30),
    ) {
        let engine = Engine::new();
        let account = engine.create_account("alice", "USD");

        for (i, op) in ops.iter().enumerate() {
            let key = format!("k-{i}");
            let _ = match op {
                Op::Deposit(amount) => engine
                    .process_deposit(TransactionRequest::deposit(account.id, *amount, key)),
                Op::Withdrawal(amount) => engine
                    .process_withdrawal(TransactionRequest::withdrawal(account.id, *amount, key)),
            };
            prop_assert!(engine.balance_of(account.id).unwrap() >= Decimal::ZERO);
        }
    }

    /// Deposits alone sum to the balance.
    #[test]
    fn deposits_sum_to_balance(
        amounts in prop::collection::vec(arb_amount(), 1..20),
    ) {
        let engine = Engine::new();
        let account = engine.create_account("alice", "USD");
        let expected: Decimal = amounts.iter().copied().sum();

        for (i, amount) in amounts.iter().enumerate() {
            engine
                .process_deposit(TransactionRequest::deposit(account.id, *amount, format!("k-{i}")))
                .unwrap();
        }

        prop_assert_eq!(engine.balance_of(account.id).unwrap(), expected);
    }

    /// Order of deposits doesn't affect final balance.
    #[test]
    fn deposit_order_independent(
        amounts in prop::collection::vec(arb_amount(), 2..10),
    ) {
        let forward = Engine::new();
        let fwd_account = forward.create_account("alice", "USD");
        for (i, amount) in amounts.iter().enumerate() {
            forward
                .process_deposit(TransactionRequest::deposit(
                    fwd_account.id,
                    *amount,
                    format!("f-{i}"),
                ))
                .unwrap();
        }

        let reverse = Engine::new();
        let rev_account = reverse.create_account("alice", "USD");
        for (i, amount) in amounts.iter().rev().enumerate() {
            reverse
                .process_deposit(TransactionRequest::deposit(
                    rev_account.id,
                    *amount,
                    format!("r-{i}"),
                ))
                .unwrap();
        }

        prop_assert_eq!(
            forward.balance_of(fwd_account.id).unwrap(),
            reverse.balance_of(rev_account.id).unwrap()
        );
    }
}

// =============================================================================
// Double-Entry Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every committed transaction produces a balanced entry pair.
    #[test]
    fn committed_entries_are_balanced(
        deposit_amount in arb_amount(),
        transfer_fraction in 0.01f64..0.99,
    ) {
        let engine = Engine::new();
        let alice = engine.create_account("alice", "USD");
        let bob = engine.create_account("bob", "USD");

        let deposit = engine
            .process_deposit(TransactionRequest::deposit(alice.id, deposit_amount, "d"))
            .unwrap();
        prop_assert!(entries_are_balanced(&deposit.entries));

        let transfer_amount =
            (deposit_amount * Decimal::try_from(transfer_fraction).unwrap()).round_dp(4);
        if transfer_amount > Decimal::ZERO {
            let transfer = engine
                .process_transfer(TransactionRequest::transfer(
                    alice.id,
                    bob.id,
                    transfer_amount,
                    "t",
                ))
                .unwrap();
            prop_assert!(entries_are_balanced(&transfer.entries));
        }
    }

    /// The whole ledger, vault included, always nets to zero.
    #[test]
    fn whole_ledger_nets_to_zero(
        ops in prop::collection::vec(arb_op(), 1..30),
    ) {
        let engine = Engine::new();
        let alice = engine.create_account("alice", "USD");
        let bob = engine.create_account("bob", "USD");

        for (i, op) in ops.iter().enumerate() {
            let key = format!("k-{i}");
            let target = if i % 2 == 0 { alice.id } else { bob.id };
            let _ = match op {
                Op::Deposit(amount) => {
                    engine.process_deposit(TransactionRequest::deposit(target, *amount, key))
                }
                Op::Withdrawal(amount) => {
                    engine.process_withdrawal(TransactionRequest::withdrawal(target, *amount, key))
                }
            };
        }

        if let Some(vault) = engine.vault_account() {
            let total = engine.balance_of(alice.id).unwrap()
                + engine.balance_of(bob.id).unwrap()
                + engine.balance_of(vault.id).unwrap();
            prop_assert_eq!(total, Decimal::ZERO);
        }
    }

    /// Transfers conserve the combined balance of the pair.
    #[test]
    fn transfer_conserves_pair_total(
        seed in arb_amount(),
        transfer_fraction in 0.01f64..0.99,
    ) {
        let engine = Engine::new();
        let alice = engine.create_account("alice", "USD");
        let bob = engine.create_account("bob", "USD");
        engine
            .process_deposit(TransactionRequest::deposit(alice.id, seed, "seed"))
            .unwrap();

        let amount = (seed * Decimal::try_from(transfer_fraction).unwrap()).round_dp(4);
        if amount > Decimal::ZERO {
            engine
                .process_transfer(TransactionRequest::transfer(alice.id, bob.id, amount, "t"))
                .unwrap();
        }

        let total =
            engine.balance_of(alice.id).unwrap() + engine.balance_of(bob.id).unwrap();
        prop_assert_eq!(total, seed);
    }
}

// =============================================================================
// Idempotency Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Replaying any operation with its key never changes state.
    #[test]
    fn replay_is_a_no_op(
        amount in arb_amount(),
        replays in 1usize..5,
    ) {
        let engine = Engine::new();
        let account = engine.create_account("alice", "USD");

        let first = engine
            .process_deposit(TransactionRequest::deposit(account.id, amount, "dep"))
            .unwrap();
        let balance_after_first = engine.balance_of(account.id).unwrap();

        for _ in 0..replays {
            let replay = engine
                .process_deposit(TransactionRequest::deposit(account.id, amount, "dep"))
                .unwrap();
            prop_assert_eq!(replay.id(), first.id());
        }

        prop_assert_eq!(engine.balance_of(account.id).unwrap(), balance_after_first);
        prop_assert_eq!(engine.ledger_entries_of(account.id).unwrap().len(), 1);
    }

    /// A replayed transfer returns the original entries, not new ones.
    #[test]
    fn replayed_transfer_returns_original_entries(
        seed in arb_amount(),
    ) {
        let engine = Engine::new();
        let alice = engine.create_account("alice", "USD");
        let bob = engine.create_account("bob", "USD");
        engine
            .process_deposit(TransactionRequest::deposit(alice.id, seed, "seed"))
            .unwrap();

        let first = engine
            .process_transfer(TransactionRequest::transfer(alice.id, bob.id, seed, "t"))
            .unwrap();
        let replay = engine
            .process_transfer(TransactionRequest::transfer(alice.id, bob.id, seed, "t"))
            .unwrap();

        prop_assert_eq!(&replay.entries, &first.entries);
        prop_assert_eq!(engine.balance_of(bob.id).unwrap(), seed);
    }
}

// =============================================================================
// Failure Atomicity Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// A refused overdraft leaves every balance exactly as it was.
    #[test]
    fn overdraft_refusal_leaves_state_untouched(
        seed in arb_amount(),
        extra in arb_amount(),
    ) {
        let engine = Engine::new();
        let alice = engine.create_account("alice", "USD");
        let bob = engine.create_account("bob", "USD");
        engine
            .process_deposit(TransactionRequest::deposit(alice.id, seed, "seed"))
            .unwrap();

        let result = engine.process_transfer(TransactionRequest::transfer(
            alice.id,
            bob.id,
            seed + extra,
            "t",
        ));

        prop_assert_eq!(result, Err(LedgerError::InsufficientFunds));
        prop_assert_eq!(engine.balance_of(alice.id).unwrap(), seed);
        prop_assert_eq!(engine.balance_of(bob.id).unwrap(), Decimal::ZERO);
        prop_assert!(engine.ledger_entries_of(bob.id).unwrap().is_empty());
    }

    /// A failed operation never consumes its idempotency key.
    #[test]
    fn failed_operation_leaves_key_usable(
        seed in arb_amount(),
        extra in arb_amount(),
    ) {
        let engine = Engine::new();
        let account = engine.create_account("alice", "USD");
        engine
            .process_deposit(TransactionRequest::deposit(account.id, seed, "seed"))
            .unwrap();

        // Overdraft with key "w" fails...
        let refused = engine.process_withdrawal(TransactionRequest::withdrawal(
            account.id,
            seed + extra,
            "w",
        ));
        prop_assert_eq!(refused, Err(LedgerError::InsufficientFunds));

        // ...so a funded retry under the same key must go through.
        let retry = engine
            .process_withdrawal(TransactionRequest::withdrawal(account.id, seed, "w"))
            .unwrap();
        prop_assert_eq!(retry.entries.len(), 2);
        prop_assert_eq!(engine.balance_of(account.id).unwrap(), Decimal::ZERO);
    }
}
