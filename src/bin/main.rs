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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use ledger_engine_rs::{Engine, TransactionRequest, VAULT_ACCOUNT_NAME};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Ledger Engine - Replay an operations CSV through the ledger
///
/// Reads deposits, withdrawals, and transfers from a CSV file and prints
/// the resulting account balances to stdout. Accounts are created on
/// first reference, in USD.
#[derive(Parser, Debug)]
#[command(name = "ledger-engine-rs")]
#[command(about = "A double-entry ledger engine that replays operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,source,destination,amount,key
    /// Example: cargo run -- operations.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = Engine::new();
    let accounts = match replay_operations(&engine, BufReader::new(file)) {
        Ok(accounts) => accounts,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_balances(&engine, &accounts, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, source, destination, amount, key`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op: String,
    source: Option<String>,
    destination: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    key: String,
}

/// Output row: one account with its derived balance.
#[derive(Debug, Serialize)]
struct BalanceRecord<'a> {
    account: &'a str,
    currency: String,
    balance: Decimal,
}

/// Replays operations from a CSV reader through the engine.
///
/// Accounts are referenced by name and created on first use. Malformed
/// rows and rejected operations are skipped; the replay keeps going.
/// Returns the name -> id mapping of every account the CSV referenced.
fn replay_operations<R: Read>(
    engine: &Engine,
    reader: R,
) -> Result<BTreeMap<String, ledger_engine_rs::AccountId>, csv::Error> {
    let mut accounts = BTreeMap::new();
    let mut resolve = |engine: &Engine, name: &str| {
        *accounts
            .entry(name.to_string())
            .or_insert_with(|| engine.create_account(name, "USD").id)
    };

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed row: {}", e);
                continue;
            }
        };

        let Some(amount) = record.amount else {
            warn!(key = %record.key, "skipping row without a valid amount");
            continue;
        };

        let outcome = match record.op.to_lowercase().as_str() {
            "deposit" => match record.destination.as_deref() {
                Some(name) => {
                    let destination = resolve(engine, name);
                    engine.process_deposit(TransactionRequest::deposit(
                        destination,
                        amount,
                        record.key.clone(),
                    ))
                }
                None => {
                    warn!(key = %record.key, "deposit row missing destination");
                    continue;
                }
            },
            "withdrawal" => match record.source.as_deref() {
                Some(name) => {
                    let source = resolve(engine, name);
                    engine.process_withdrawal(TransactionRequest::withdrawal(
                        source,
                        amount,
                        record.key.clone(),
                    ))
                }
                None => {
                    warn!(key = %record.key, "withdrawal row missing source");
                    continue;
                }
            },
            "transfer" => match (record.source.as_deref(), record.destination.as_deref()) {
                (Some(from), Some(to)) => {
                    let source = resolve(engine, from);
                    let destination = resolve(engine, to);
                    engine.process_transfer(TransactionRequest::transfer(
                        source,
                        destination,
                        amount,
                        record.key.clone(),
                    ))
                }
                _ => {
                    warn!(key = %record.key, "transfer row missing a participant");
                    continue;
                }
            },
            other => {
                warn!(op = other, "skipping unknown operation");
                continue;
            }
        };

        if let Err(e) = outcome {
            warn!(key = %record.key, "operation rejected: {}", e);
        }
    }

    Ok(accounts)
}

/// Writes final balances, vault included, as CSV with scale-4 amounts.
fn write_balances<W: Write>(
    engine: &Engine,
    accounts: &BTreeMap<String, ledger_engine_rs::AccountId>,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for (name, id) in accounts {
        if let Ok(account) = engine.get_account(*id) {
            let mut balance = engine.balance_of(*id).unwrap_or_default();
            balance.rescale(4);
            wtr.serialize(BalanceRecord {
                account: name,
                currency: account.currency,
                balance,
            })?;
        }
    }

    if let Some(vault) = engine.vault_account() {
        let mut balance = engine.balance_of(vault.id).unwrap_or_default();
        balance.rescale(4);
        wtr.serialize(BalanceRecord {
            account: VAULT_ACCOUNT_NAME,
            currency: vault.currency,
            balance,
        })?;
    }

    wtr.flush()?;
    Ok(())
}
