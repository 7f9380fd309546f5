//! # Reconcile
//!
//! Reconciles a budget JSON document from the command line.
//!
//! ## Usage
//! ```bash
//! # Reconcile and print the result as compact JSON
//! cargo run -p reconciler-session --bin reconcile -- budget.json
//!
//! # Pretty-print, with an explicit config file
//! cargo run -p reconciler-session --bin reconcile -- budget.json --config ./reconciler.toml --pretty
//!
//! # Take the definitive total from the estimate's filename when it has one
//! cargo run -p reconciler-session --bin reconcile -- budget.json --estimate "Smith-$5,000.00.pdf"
//! ```
//!
//! ## Input
//! A `ReconcileInput` document (camelCase keys, money in cents, rates as
//! fractions). `oAndPPercent` and `taxRate` may be omitted; the configured
//! rates are used instead.
//!
//! Logs go to stderr, the result to stdout.

use std::env;
use std::path::PathBuf;

use reconciler_core::ReconcileInput;
use reconciler_session::definitive;
use reconciler_session::{init_tracing, BudgetSession, ReconcilerConfig, SessionError};
use tracing::info;

fn print_help() {
    println!("Budget Reconciler");
    println!();
    println!("Usage: reconcile <INPUT.json> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    Config file (default: platform config dir)");
    println!("  -e, --estimate <NAME>  Estimate filename; a $ amount in it overrides definitiveTotal");
    println!("  -p, --pretty           Pretty-print the JSON result");
    println!("  -s, --snapshot         Print the full session snapshot instead of the result");
    println!("  -h, --help             Show this help message");
}

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    input_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    estimate_name: Option<String>,
    pretty: bool,
    snapshot: bool,
    help: bool,
}

/// Parses everything after the program name.
///
/// Options that take a value fail when the value is missing, and unknown
/// `-` flags fail instead of being read as the input path.
fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().ok_or_else(|| format!("{arg} requires a <PATH>"))?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            "--estimate" | "-e" => {
                let value = args.next().ok_or_else(|| format!("{arg} requires a <NAME>"))?;
                parsed.estimate_name = Some(value.clone());
            }
            "--pretty" | "-p" => parsed.pretty = true,
            "--snapshot" | "-s" => parsed.snapshot = true,
            "--help" | "-h" => parsed.help = true,
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option: {flag}"));
            }
            path => {
                if parsed.input_path.is_some() {
                    return Err(format!("unexpected extra argument: {path}"));
                }
                parsed.input_path = Some(PathBuf::from(path));
            }
        }
    }

    Ok(parsed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            print_help();
            return Err(message.into());
        }
    };

    if cli.help {
        print_help();
        return Ok(());
    }

    let Some(input_path) = cli.input_path else {
        print_help();
        return Err("missing <INPUT.json>".into());
    };

    init_tracing();

    let config = ReconcilerConfig::load(cli.config_path)?;
    let contents = std::fs::read_to_string(&input_path)?;
    let mut input: ReconcileInput = serde_json::from_str(&contents).map_err(SessionError::from)?;

    if let Some(name) = cli.estimate_name.as_deref() {
        let rcv = Some(input.definitive_total);
        let resolved = definitive::resolve(Some(name), rcv)
            .ok_or_else(|| SessionError::MissingDefinitiveTotal(name.to_string()))?;
        info!(amount = %resolved.amount, source = %resolved.source, "Definitive total resolved");
        input.definitive_total = resolved.amount;
    }

    info!(
        path = %input_path.display(),
        categories = input.categories_pre.len(),
        target = %config.format_currency(input.definitive_total),
        "Reconciling budget"
    );

    let session = BudgetSession::reconcile_initial(input, &config)?;

    let output = if cli.snapshot {
        serde_json::to_value(session.snapshot())?
    } else {
        serde_json::to_value(session.result())?
    };

    if cli.pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", serde_json::to_string(&output)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = parse_args(&args(&[
            "budget.json",
            "--config",
            "reconciler.toml",
            "-e",
            "Smith-$5,000.00.pdf",
            "--pretty",
            "-s",
        ]))
        .unwrap();

        assert_eq!(cli.input_path, Some(PathBuf::from("budget.json")));
        assert_eq!(cli.config_path, Some(PathBuf::from("reconciler.toml")));
        assert_eq!(cli.estimate_name.as_deref(), Some("Smith-$5,000.00.pdf"));
        assert!(cli.pretty);
        assert!(cli.snapshot);
        assert!(!cli.help);
    }

    #[test]
    fn test_missing_option_value_is_an_error() {
        assert_eq!(
            parse_args(&args(&["budget.json", "--config"])),
            Err("--config requires a <PATH>".to_string())
        );
        assert_eq!(
            parse_args(&args(&["budget.json", "-e"])),
            Err("-e requires a <NAME>".to_string())
        );
    }

    #[test]
    fn test_unknown_flag_is_not_the_input_path() {
        assert_eq!(
            parse_args(&args(&["--verbose", "budget.json"])),
            Err("unknown option: --verbose".to_string())
        );
        assert!(parse_args(&args(&["budget.json", "-x"])).is_err());
    }

    #[test]
    fn test_second_positional_is_an_error() {
        assert!(parse_args(&args(&["a.json", "b.json"])).is_err());
    }

    #[test]
    fn test_help_and_empty() {
        assert!(parse_args(&args(&["-h"])).unwrap().help);
        assert_eq!(parse_args(&[]).unwrap(), CliArgs::default());
    }
}
