//! Command-line surface over the ledger service.

use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::error::Result;
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Flag names that may also be written Go-style with a single dash.
const LONG_FLAGS: &[&str] = &[
    "address", "from", "to", "amount", "data", "config", "db", "help", "version",
];

#[derive(Parser, Debug)]
#[command(name = "blockledger", author, version, about = "A local proof-of-work ledger", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger file, overriding database.path from the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print all the blocks of the blockchain
    #[command(name = "printchain")]
    PrintChain,
    /// Create a blockchain and send the genesis reward to ADDRESS
    #[command(name = "createblockchain")]
    CreateBlockchain {
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        address: String,
    },
    /// Get the balance of ADDRESS
    #[command(name = "getbalance")]
    GetBalance {
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        address: String,
    },
    /// Send AMOUNT of coins from FROM to TO
    Send {
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        from: String,
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        to: String,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        amount: u64,
    },
    /// Add a block carrying DATA to the blockchain
    #[command(name = "addblock")]
    AddBlock {
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        data: String,
    },
    /// Check proof of work and hash linkage of every block
    #[command(name = "verifychain")]
    VerifyChain,
}

/// Rewrites Go-style `-flag` / `-flag=value` arguments to `--flag` form.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .enumerate()
        .map(|(position, arg)| {
            if position == 0 || arg.starts_with("--") || !arg.starts_with('-') {
                return arg;
            }
            let name = arg[1..].split('=').next().unwrap_or_default();
            if LONG_FLAGS.contains(&name) {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

impl Cli {
    pub fn db_path<'a>(&'a self, config: &'a Config) -> &'a Path {
        self.db
            .as_deref()
            .unwrap_or_else(|| Path::new(&config.database.path))
    }
}

pub fn run<W: Write>(cli: &Cli, config: &Config, out: &mut W) -> Result<()> {
    let path = cli.db_path(config);
    let difficulty = config.mining.difficulty;

    match &cli.command {
        Commands::CreateBlockchain { address } => {
            let chain = Blockchain::create(path, address, difficulty)?;
            writeln!(out, "{}", "Blockchain created successfully!".bright_green())?;
            writeln!(out, "Genesis: {}", hex::encode(chain.tip()))?;
        }
        Commands::GetBalance { address } => {
            let chain = Blockchain::open(path, difficulty)?;
            let balance = chain.get_balance(address)?;
            writeln!(out, "Balance of '{}': {}", address, balance)?;
        }
        Commands::Send { from, to, amount } => {
            let chain = Blockchain::open(path, difficulty)?;
            let block = chain.send(from, to, *amount)?;
            writeln!(out, "{}", "Transaction successful!".bright_green())?;
            writeln!(out, "Block: {}", block.hash_hex())?;
        }
        Commands::AddBlock { data } => {
            let chain = Blockchain::open(path, difficulty)?;
            let block = chain.add_block(data.as_bytes())?;
            writeln!(out, "{}", "Success!".bright_green())?;
            writeln!(out, "Block: {}", block.hash_hex())?;
        }
        Commands::PrintChain => {
            let chain = Blockchain::open(path, difficulty)?;
            for block in chain.iter() {
                print_block(out, &block?)?;
            }
        }
        Commands::VerifyChain => {
            let chain = Blockchain::open(path, difficulty)?;
            let count = chain.verify()?;
            writeln!(out, "{} {} blocks", "Chain verified:".bright_green(), count)?;
        }
    }
    Ok(())
}

pub fn print_block<W: Write>(out: &mut W, block: &Block) -> Result<()> {
    writeln!(out, "{} {}", "Previous hash:".bright_cyan(), block.prev_hash_hex())?;
    if block.transactions.is_empty() {
        writeln!(out, "{} {}", "Data:".bright_cyan(), String::from_utf8_lossy(&block.data))?;
    } else {
        writeln!(out, "{}", "Transactions:".bright_cyan())?;
        for tx in &block.transactions {
            let kind = if tx.is_coinbase() { "coinbase" } else { "transfer" };
            writeln!(out, "  {} ({})", tx.id_hex(), kind)?;
            for input in tx.inputs.iter().filter(|_| !tx.is_coinbase()) {
                writeln!(
                    out,
                    "    in:  {}:{} by {}",
                    hex::encode(&input.prev_tx_id),
                    input.output_index,
                    input.unlocking_data
                )?;
            }
            for output in &tx.outputs {
                writeln!(out, "    out: {} -> {}", output.value, output.locking_address)?;
            }
        }
    }
    writeln!(out, "{} {}", "Hash:".bright_cyan(), block.hash_hex())?;
    writeln!(out, "{} {}", "Timestamp:".bright_cyan(), block.timestamp)?;
    writeln!(out, "{} {}", "Nonce:".bright_cyan(), block.nonce)?;
    writeln!(out, "{} {}", "PoW:".bright_cyan(), block.validate_pow())?;
    writeln!(out)?;
    Ok(())
}
