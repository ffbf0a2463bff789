use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::application::{AppConfig, PaymentRequest, PaymentService};
use crate::conversion::ConversionPolicy;
use crate::domain::{
    AccountKind, BalanceSnapshot, Cents, Currency, Profile, format_cents, parse_cents,
};
use crate::io::Exporter;
use crate::observability::{ObservabilitySink, RecordingSink, TracingSink, init_logging};

const NOTIFICATION_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// finserv - checking/savings ledger with currency-normalized vendor payments
#[derive(Parser)]
#[command(name = "finserv")]
#[command(about = "Move money between checking and savings and pay vendors in USD, EUR or CAD")]
#[command(version)]
pub struct Cli {
    /// Settings file (TOML); defaults to ./finserv.toml when present
    #[arg(short, long, global = true, env = "FINSERV_CONFIG")]
    pub config: Option<String>,

    /// Override the account number shown on the ledger
    #[arg(long, global = true)]
    pub account_number: Option<String>,

    /// Use built-in exchange rates instead of the rate service
    #[arg(long, global = true)]
    pub offline: bool,

    /// Refuse payments whose amount could not be converted to USD
    #[arg(long, global = true)]
    pub strict: bool,

    /// Print the recorded spans after each command
    #[arg(long, global = true)]
    pub trace: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show checking and savings balances
    Balance,

    /// Move money between checking and savings
    Transfer {
        /// Amount to transfer (e.g., "500.00" or "500")
        amount: String,

        /// Source account: checking or savings
        #[arg(long, default_value = "checking")]
        from: String,

        /// Destination account: checking or savings
        #[arg(long, default_value = "savings")]
        to: String,
    },

    /// Pay a vendor, converting the amount to USD first
    Pay {
        /// Amount in the payment currency
        amount: String,

        /// Vendor name (see `vendors`)
        #[arg(long)]
        vendor: String,

        /// Account to pay from: checking or savings
        #[arg(long, default_value = "checking")]
        from: String,

        /// Payment currency: USD, EUR or CAD
        #[arg(long, default_value = "USD")]
        currency: String,

        /// Recipient name (defaults to the vendor)
        #[arg(long)]
        recipient: Option<String>,
    },

    /// Show what an amount is worth in USD
    Convert {
        /// Amount to convert
        amount: String,

        /// Source currency: USD, EUR or CAD
        #[arg(long)]
        currency: String,
    },

    /// List the vendors payments can be sent to
    Vendors,

    /// Show or update the account holder profile
    Profile {
        /// New holder name
        #[arg(long)]
        name: Option<String>,

        /// New holder email
        #[arg(long)]
        email: Option<String>,

        /// New account number
        #[arg(long)]
        number: Option<String>,
    },

    /// Export balances as csv or json
    Export {
        /// Format: csv, json
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run commands from stdin against one ledger until EOF or `quit`
    Session,
}

/// One line typed inside `session`.
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config =
            AppConfig::load(self.config.as_deref()).context("Failed to load settings")?;

        if let Some(account_number) = &self.account_number {
            config.account_number = account_number.clone();
        }
        if self.offline {
            config.offline = true;
        }
        if self.strict {
            config.conversion_policy = ConversionPolicy::Strict;
        }

        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        init_logging(self.verbose);

        let config = self.load_config()?;
        let recorder = RecordingSink::new();
        let sink: Arc<dyn ObservabilitySink> = if self.trace {
            Arc::new(recorder.clone())
        } else {
            Arc::new(TracingSink)
        };
        let service = PaymentService::from_config(&config, sink)?;

        let result = match self.command {
            Commands::Session => run_session(&service, self.trace.then_some(&recorder)).await,
            command => run_command(&service, command).await,
        };
        if self.trace {
            print_trace(&recorder);
        }

        // The runtime stops when `run` returns; let vendor POSTs finish first.
        service.flush_notifications(NOTIFICATION_FLUSH_TIMEOUT).await;
        result
    }
}

async fn run_command(service: &PaymentService, command: Commands) -> Result<()> {
    match command {
        Commands::Balance => print_balances(&service.balances()),

        Commands::Transfer { amount, from, to } => {
            let amount_cents = parse_amount(&amount)?;
            let result = service.transfer(&from, &to, amount_cents)?;
            println!(
                "Transfer successful: {} {} -> {}",
                format_cents(result.amount),
                result.from,
                result.to
            );
            print_balances(&result.balances);
        }

        Commands::Pay {
            amount,
            vendor,
            from,
            currency,
            recipient,
        } => {
            let amount_cents = parse_amount(&amount)?;
            let currency = Currency::parse(&currency)?;

            let result = service
                .pay(PaymentRequest {
                    vendor,
                    recipient,
                    account: from,
                    amount: amount_cents,
                    currency,
                })
                .await?;

            let conversion = &result.conversion;
            if conversion.source_currency != Currency::HOME {
                if conversion.fallback_used {
                    println!(
                        "Warning: {} rate unavailable, charged the unconverted amount",
                        conversion.source_currency
                    );
                } else {
                    println!(
                        "Converted amount: ${} USD",
                        format_cents(conversion.usd_amount)
                    );
                }
            }
            println!(
                "Payment of {} {} to {} was successful! ({})",
                format_cents(conversion.source_amount),
                conversion.source_currency,
                result.vendor,
                result.id
            );
            print_balances(&result.balances);
        }

        Commands::Convert { amount, currency } => {
            let amount_cents = parse_amount(&amount)?;
            let currency = Currency::parse(&currency)?;
            let result = service.convert(amount_cents, currency).await;

            println!(
                "{} {} = {} USD{}",
                format_cents(result.source_amount),
                result.source_currency,
                format_cents(result.usd_amount),
                if result.fallback_used {
                    " (rate unavailable, not converted)"
                } else {
                    ""
                }
            );
        }

        Commands::Vendors => {
            for vendor in service.vendors().list() {
                match &vendor.endpoint {
                    Some(endpoint) => println!("{:<24} {}", vendor.name, endpoint),
                    None => println!("{:<24} (no notification endpoint)", vendor.name),
                }
            }
        }

        Commands::Profile {
            name,
            email,
            number,
        } => {
            let current = service.profile();
            let profile = if name.is_none() && email.is_none() && number.is_none() {
                current
            } else {
                service.update_profile(Profile::new(
                    name.unwrap_or(current.name),
                    email.unwrap_or(current.email),
                    number.unwrap_or(current.account_number),
                ))?
            };

            println!("Name:           {}", display_or_dash(&profile.name));
            println!("Email:          {}", display_or_dash(&profile.email));
            println!("Account number: {}", display_or_dash(&profile.account_number));
        }

        Commands::Export { format, output } => {
            run_export_command(service, &format, output.as_deref())?;
        }

        Commands::Session => bail!("Already in a session"),
    }

    Ok(())
}

async fn run_session(service: &PaymentService, recorder: Option<&RecordingSink>) -> Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if interactive {
            stdout.write_all(b"finserv> ").await?;
            stdout.flush().await?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let args = match split_args(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("Error: {}", err);
                continue;
            }
        };

        let command = match SessionLine::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                // Also covers `help` / `--help`, which clap reports as an error.
                let _ = err.print();
                continue;
            }
        };

        if let Err(err) = run_command(service, command).await {
            eprintln!("Error: {:#}", err);
        }

        if let Some(recorder) = recorder {
            print_trace(recorder);
            recorder.clear();
        }
    }

    Ok(())
}

fn run_export_command(service: &PaymentService, format: &str, output: Option<&str>) -> Result<()> {
    let exporter = Exporter::new(service);

    let writer: Box<dyn std::io::Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    match format.to_lowercase().as_str() {
        "csv" => {
            let count = exporter.export_balances_csv(writer)?;
            if let Some(path) = output {
                eprintln!("Exported {} balances to {}", count, path);
            }
        }
        "json" => {
            exporter.export_snapshot_json(writer)?;
            if let Some(path) = output {
                eprintln!("Exported snapshot to {}", path);
            }
        }
        other => bail!("Unknown export format '{}'. Use csv or json", other),
    }

    Ok(())
}

fn parse_amount(input: &str) -> Result<Cents> {
    parse_cents(input).context("Invalid amount format. Use '50.00' or '50'")
}

fn print_balances(snapshot: &BalanceSnapshot) {
    println!("Account {} balances", snapshot.account_number);
    println!("{:<12} {:>14}", "ACCOUNT", "BALANCE");
    println!("{}", "-".repeat(27));
    for account in AccountKind::ALL {
        println!(
            "{:<12} {:>14}",
            account.as_str(),
            format!("${}", format_cents(snapshot.balance(account)))
        );
    }
}

fn print_trace(recorder: &RecordingSink) {
    for event in recorder.events() {
        let elapsed = event.ended_at - event.started_at;
        let attributes = event
            .attributes
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");
        eprintln!(
            "[span] {} {}ms {}",
            event.name,
            elapsed.num_milliseconds(),
            attributes
        );
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

/// Split a session line into arguments. Double quotes group words, so
/// vendor names with spaces can be passed: `pay 20 --vendor "Metro Mobile"`.
fn split_args(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        bail!("Unterminated quote");
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args(r#"pay 20 --vendor "Metro Mobile" --currency EUR"#).unwrap(),
            vec!["pay", "20", "--vendor", "Metro Mobile", "--currency", "EUR"]
        );
        assert_eq!(split_args("  balance  ").unwrap(), vec!["balance"]);
        assert_eq!(split_args(r#"profile --name """#).unwrap(), vec!["profile", "--name", ""]);
        assert!(split_args(r#"pay "oops"#).is_err());
    }

    #[test]
    fn test_session_line_parses_commands() {
        let line = SessionLine::try_parse_from(["transfer", "500.00", "--from", "savings"]).unwrap();
        match line.command {
            Commands::Transfer { amount, from, to } => {
                assert_eq!(amount, "500.00");
                assert_eq!(from, "savings");
                assert_eq!(to, "savings");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "finserv",
            "pay",
            "100",
            "--vendor",
            "Acme Utilities",
            "--currency",
            "EUR",
            "--offline",
            "--strict",
        ])
        .unwrap();
        assert!(cli.offline);
        assert!(cli.strict);
        assert!(matches!(cli.command, Commands::Pay { .. }));
    }

    #[test]
    fn test_config_path_reads_environment() {
        use clap::CommandFactory;

        let command = Cli::command();
        let config = command
            .get_arguments()
            .find(|arg| arg.get_id() == "config")
            .unwrap();
        assert_eq!(
            config.get_env(),
            Some(std::ffi::OsStr::new("FINSERV_CONFIG"))
        );
    }
}
