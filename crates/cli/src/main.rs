//! Transaction rules CLI.
//!
//! `tally check` compiles and resolves rule documents; `tally apply`
//! runs a rule-set over a JSON batch of transactions. Diagnostics go to
//! stderr; `apply` writes the updated batch to stdout or `--out`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use tally_core::{resolve_references, ResolvedScope, Scope};
use tally_eval::Transaction;

/// Transaction categorization rules toolchain.
#[derive(Parser)]
#[command(name = "tally", version, about = "Transaction categorization rules toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and resolve rule documents, reporting what they define
    Check {
        /// YAML rule documents; multiple documents merge into one scope
        #[arg(required = true)]
        rules: Vec<PathBuf>,
    },

    /// Apply a rule-set to a batch of transactions
    Apply {
        /// YAML rule document
        rules: PathBuf,
        /// Rule-set to apply
        #[arg(long)]
        ruleset: String,
        /// JSON array of transactions
        #[arg(long)]
        transactions: PathBuf,
        /// Write the updated batch here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Check { rules } => run_check(&rules),
        Commands::Apply {
            rules,
            ruleset,
            transactions,
            out,
        } => run_apply(&rules, &ruleset, &transactions, out.as_deref()),
    };
    process::exit(code);
}

fn run_check(paths: &[PathBuf]) -> i32 {
    let scope = match load_scope(paths) {
        Ok(scope) => scope,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };
    for rule_set in &scope.scope().rulesets {
        println!(
            "{}: {} tests, {} actions, {} rules",
            rule_set.name,
            rule_set.tests.len(),
            rule_set.actions.len(),
            rule_set.rules.len()
        );
    }
    0
}

fn run_apply(rules: &Path, ruleset: &str, transactions: &Path, out: Option<&Path>) -> i32 {
    let scope = match load_scope(std::slice::from_ref(&rules.to_path_buf())) {
        Ok(scope) => scope,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };

    let raw = match fs::read_to_string(transactions) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("{}: {err}", transactions.display());
            return 1;
        }
    };
    let mut batch: Vec<Transaction> = match serde_json::from_str(&raw) {
        Ok(batch) => batch,
        Err(err) => {
            eprintln!("{}: {err}", transactions.display());
            return 1;
        }
    };

    // One bad record must not block the rest of the batch.
    let mut matched = 0usize;
    let mut failed = 0usize;
    for (index, tx) in batch.iter_mut().enumerate() {
        match tally_eval::apply(&scope, ruleset, tx) {
            Ok(true) => matched += 1,
            Ok(false) => {}
            Err(err) => {
                failed += 1;
                eprintln!("transaction {index}: {err}");
            }
        }
    }

    let rendered = match serde_json::to_string_pretty(&batch) {
        Ok(rendered) => rendered,
        Err(err) => {
            eprintln!("failed to serialize transactions: {err}");
            return 1;
        }
    };
    match out {
        Some(path) => {
            if let Err(err) = fs::write(path, rendered + "\n") {
                eprintln!("{}: {err}", path.display());
                return 1;
            }
        }
        None => println!("{rendered}"),
    }

    eprintln!(
        "{matched} of {} transactions matched, {failed} failed",
        batch.len()
    );
    if failed > 0 {
        1
    } else {
        0
    }
}

/// Read, compile, and merge every document, then resolve the combined
/// scope. Errors are rendered with the offending path.
fn load_scope(paths: &[PathBuf]) -> Result<ResolvedScope, String> {
    let mut scope = Scope::default();
    for path in paths {
        let src =
            fs::read_to_string(path).map_err(|err| format!("{}: {err}", path.display()))?;
        let compiled = tally_core::compile_rules(&src)
            .map_err(|err| format!("{}: {err}", path.display()))?;
        scope
            .merge(compiled)
            .map_err(|err| format!("{}: {err}", path.display()))?;
    }
    resolve_references(scope).map_err(|err| err.to_string())
}
