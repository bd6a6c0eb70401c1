//! Integration tests for the command-line surface

use blockledger::cli::{normalize_args, run, Cli};
use blockledger::config::parse_config;
use blockledger::error::ChainError;
use clap::Parser;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        colored::control::set_override(false);
        Ok(Self { dir: TempDir::new()? })
    }

    /// Runs one command against the harness ledger and returns its stdout.
    fn run(&self, args: &[&str]) -> Result<String, ChainError> {
        let db = self.dir.path().join("blockchain.db");
        let mut argv = vec![
            "blockledger".to_string(),
            "--db".to_string(),
            db.display().to_string(),
        ];
        argv.extend(args.iter().map(|s| s.to_string()));

        let cli = Cli::try_parse_from(normalize_args(argv)).expect("valid arguments");
        let config = parse_config("[mining]\ndifficulty = 8\n")?;
        let mut out = Vec::new();
        run(&cli, &config, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[test]
fn test_create_send_and_balance() -> Result<(), Box<dyn std::error::Error>> {
    let harness = Harness::new()?;

    let out = harness.run(&["createblockchain", "-address=A"])?;
    assert!(out.contains("Blockchain created successfully!"));

    let out = harness.run(&["send", "-from=A", "-to=B", "-amount=4"])?;
    assert!(out.contains("Transaction successful!"));

    assert!(harness.run(&["getbalance", "-address=A"])?.contains("Balance of 'A': 6"));
    assert!(harness.run(&["getbalance", "-address=B"])?.contains("Balance of 'B': 4"));

    Ok(())
}

#[test]
fn test_printchain_shows_every_block() -> Result<(), Box<dyn std::error::Error>> {
    let harness = Harness::new()?;
    harness.run(&["createblockchain", "--address", "A"])?;
    harness.run(&["addblock", "-data=hello chain"])?;

    let out = harness.run(&["printchain"])?;
    assert_eq!(out.matches("Previous hash:").count(), 2);
    assert_eq!(out.matches("PoW: true").count(), 2);
    assert!(out.contains("Data: hello chain"));
    assert!(out.contains("(coinbase)"));
    assert!(out.contains("out: 10 -> A"));

    assert!(harness.run(&["verifychain"])?.contains("Chain verified: 2 blocks"));

    Ok(())
}

#[test]
fn test_core_failures_surface_as_errors() -> Result<(), Box<dyn std::error::Error>> {
    let harness = Harness::new()?;

    let err = harness.run(&["getbalance", "-address=A"]).unwrap_err();
    assert!(matches!(err, ChainError::NoLedgerFound(_)));

    harness.run(&["createblockchain", "-address=A"])?;
    let err = harness.run(&["createblockchain", "-address=A"]).unwrap_err();
    assert!(matches!(err, ChainError::LedgerAlreadyExists(_)));

    let err = harness.run(&["send", "-from=A", "-to=B", "-amount=100"]).unwrap_err();
    assert_eq!(err, ChainError::InsufficientFunds { required: 100, available: 10 });

    Ok(())
}
