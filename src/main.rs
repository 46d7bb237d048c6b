use std::{fs, path::PathBuf, process::ExitCode, sync::OnceLock};

use clap::{Args as ClapArgs, Parser, Subcommand};
use numfmt::{Formatter, Precision};
use time::{Date, OffsetDateTime, macros::format_description};

use tally_rs::{
    Error, Granularity, Kind, Ledger, StorageError, Summary, Transaction, TransactionBuilder,
    ViewMode,
    category::{self, CATEGORIES},
    config::{Config, DEFAULT_DATA_PATH},
    export::write_backup,
    id::{IdGenerator, UuidGenerator},
    logging::setup_logging,
    range::format_date_label,
    report::render_report,
    storage::JsonFileStore,
};

/// Track income and expenses, and view statistics over days, weeks, months and years.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the JSON file the transactions are stored in.
    #[arg(long, global = true, default_value = DEFAULT_DATA_PATH)]
    data_path: PathBuf,

    /// Canonical timezone used for dates, e.g. "Pacific/Auckland".
    /// Defaults to $TZ, or UTC.
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// File path to write debug logs to.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a new transaction.
    Add(AddArgs),
    /// Replace the details of an existing transaction.
    Edit(EditArgs),
    /// Delete a transaction.
    Delete {
        /// The ID of the transaction to delete.
        id: String,
    },
    /// List transactions, newest first.
    List {
        /// Only list transactions within this period.
        #[arg(long)]
        granularity: Option<Granularity>,
        /// A date within the period, defaults to today.
        #[arg(long, value_parser = parse_date)]
        anchor: Option<Date>,
    },
    /// Show totals, the category breakdown and the trend for a period.
    Stats {
        /// The period to summarize.
        #[arg(long, default_value_t = Granularity::Month)]
        granularity: Granularity,
        /// A date within the period, defaults to today.
        #[arg(long, value_parser = parse_date)]
        anchor: Option<Date>,
        /// Which kind of transaction to break down by category: overview, expense or income.
        #[arg(long, default_value = "overview")]
        view: ViewMode,
        /// Also write an HTML report with charts to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write a backup of every transaction.
    Export {
        /// The directory to write the backup to.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Merge the transactions from a backup, skipping the ones already recorded.
    Import {
        /// File path to the backup.
        path: PathBuf,
    },
    /// List the available categories.
    Categories,
}

#[derive(ClapArgs, Debug)]
struct AddArgs {
    /// The amount of money, greater than zero.
    #[arg(long)]
    amount: f64,
    /// expense or income.
    #[arg(long, default_value = "expense")]
    kind: Kind,
    /// The category ID, see `tally categories`.
    #[arg(long)]
    category: Option<String>,
    /// A free text note.
    #[arg(long, default_value = "")]
    note: String,
    /// The date of the transaction (YYYY-MM-DD), defaults to today.
    #[arg(long, value_parser = parse_date)]
    date: Option<Date>,
}

#[derive(ClapArgs, Debug)]
struct EditArgs {
    /// The ID of the transaction to edit.
    id: String,
    /// The new amount.
    #[arg(long)]
    amount: Option<f64>,
    /// The new kind.
    #[arg(long)]
    kind: Option<Kind>,
    /// The new category ID.
    #[arg(long)]
    category: Option<String>,
    /// The new note.
    #[arg(long)]
    note: Option<String>,
    /// The new date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<Date>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = setup_logging(args.log_file.as_deref()) {
        eprintln!("Could not open the log file: {error}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let config = Config::new(args.data_path, args.timezone.as_deref())?;
    let calendar = config.calendar.clone();
    let now = OffsetDateTime::now_utc();
    let local_now = now.to_offset(calendar.offset_at(now));
    let today = local_now.date();

    let mut ledger = Ledger::open(JsonFileStore::new(&config.data_path), calendar.clone());

    match args.command {
        Command::Add(add) => {
            let timestamp = match add.date {
                Some(date) => calendar.timestamp_of(date.with_time(local_now.time())),
                None => tally_rs::calendar::to_timestamp(now),
            };
            let category = add
                .category
                .unwrap_or_else(|| default_category(add.kind).to_owned());
            warn_unregistered(&category);

            let transaction = Transaction::build(add.amount, add.kind, &category, timestamp)
                .note(&add.note)
                .finalize(UuidGenerator.next_id())?;
            let id = transaction.id.clone();
            ledger.add(transaction)?;

            println!("Added transaction {id}");
        }
        Command::Edit(edit) => {
            let Some(existing) = ledger.transactions().get(&edit.id) else {
                return Err(Error::UpdateMissingTransaction(edit.id));
            };

            let timestamp = match edit.date {
                Some(date) => {
                    let time = calendar.to_local(existing.timestamp).time();
                    calendar.timestamp_of(date.with_time(time))
                }
                None => existing.timestamp,
            };
            let builder = TransactionBuilder {
                amount: edit.amount.unwrap_or(existing.amount),
                kind: edit.kind.unwrap_or(existing.kind),
                category: edit.category.unwrap_or_else(|| existing.category.clone()),
                note: edit.note.unwrap_or_else(|| existing.note.clone()),
                timestamp,
            };
            warn_unregistered(&builder.category);

            ledger.replace(builder.finalize(edit.id.clone())?)?;

            println!("Updated transaction {}", edit.id);
        }
        Command::Delete { id } => {
            ledger.delete(&id)?;

            println!("Deleted transaction {id}");
        }
        Command::List {
            granularity,
            anchor,
        } => {
            let transactions = match granularity {
                Some(granularity) => {
                    let range = ledger.resolve(anchor.unwrap_or(today), granularity);
                    println!("{}", range.label);
                    ledger.transactions_in(&range)
                }
                None => ledger.transactions().sorted(),
            };

            if transactions.is_empty() {
                println!("No transactions.");
            }

            for transaction in transactions {
                println!(
                    "{:<12} {:<7} {:<16} {:>12}  {}  [{}]",
                    format_date_label(calendar.date_of(transaction.timestamp)),
                    transaction.kind,
                    transaction.category_definition().label,
                    format_currency(transaction.amount),
                    transaction.note,
                    transaction.id
                );
            }
        }
        Command::Stats {
            granularity,
            anchor,
            view,
            report,
        } => {
            let summary = ledger.summarize(anchor.unwrap_or(today), granularity, view, today);
            print_summary(&summary);

            if let Some(path) = report {
                fs::write(&path, render_report(&summary)).map_err(|error| {
                    StorageError::Write(format!("could not write {}: {error}", path.display()))
                })?;
                println!("\nWrote report to {}", path.display());
            }
        }
        Command::Export { dir } => {
            let backup = ledger.export(today)?;
            let path = write_backup(&dir, &backup)?;

            println!(
                "Exported {} transactions to {}",
                ledger.transactions().len(),
                path.display()
            );
        }
        Command::Import { path } => {
            let text = fs::read_to_string(&path).map_err(|error| {
                StorageError::Read(format!("could not read {}: {error}", path.display()))
            })?;
            let summary = ledger.import(&text)?;

            if summary.no_new_records() {
                println!(
                    "No new records were added, all {} are already recorded.",
                    summary.skipped
                );
            } else {
                println!(
                    "Imported {} new records ({} already recorded).",
                    summary.added, summary.skipped
                );
            }
        }
        Command::Categories => {
            for definition in &CATEGORIES {
                println!(
                    "{:<14} {:<20} {}",
                    definition.id, definition.label, definition.kind
                );
            }
        }
    }

    if ledger.is_dirty() {
        eprintln!(
            "Warning: changes could not be saved to {}",
            config.data_path.display()
        );
    }

    Ok(())
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("\"{text}\" is not a date in the form YYYY-MM-DD: {error}"))
}

fn default_category(kind: Kind) -> &'static str {
    category::categories_for(kind)
        .next()
        .map(|definition| definition.id)
        .unwrap_or(category::FALLBACK.id)
}

fn warn_unregistered(category_id: &str) {
    if !category::is_registered(category_id) {
        eprintln!(
            "Warning: \"{category_id}\" is not a known category and will be shown as \"{}\".",
            category::FALLBACK.label
        );
    }
}

fn print_summary(summary: &Summary) {
    println!("{}", summary.range.label);
    println!("  Income:   {:>14}", format_currency(summary.total_income));
    println!("  Expenses: {:>14}", format_currency(summary.total_expense));
    println!("  Balance:  {:>14}", format_currency(summary.balance));
    println!("  ({} transactions)", summary.transaction_count);

    if let Some(kind) = summary.view_mode.kind() {
        println!("\nBy category ({kind}):");
        if summary.category_breakdown.is_empty() {
            println!("  Nothing recorded.");
        }
        for share in &summary.category_breakdown {
            println!(
                "  {:<20} {:>14} {:>6.1}%",
                share.label,
                format_currency(share.value),
                share.percent
            );
        }
    }

    println!("\nTrend:");
    for bucket in &summary.trend {
        println!(
            "  {:<6} income {:>12}  expenses {:>12}",
            bucket.label,
            format_currency(bucket.income),
            format_currency(bucket.expense)
        );
    }
}

/// Format a number as currency, e.g. "$1,234.50" or "-$12.00".
fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    if number == 0.0 {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        return "$0.00".to_owned();
    }

    let mut formatted = positive_fmt.fmt_string(number.abs());

    // numfmt drops trailing zeros, e.g. "$1.5" instead of "$1.50".
    if let Some(decimals) = formatted.split('.').nth(1) {
        if decimals.len() == 1 {
            formatted.push('0');
        }
    } else {
        formatted.push_str(".00");
    }

    if number < 0.0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::{format_currency, parse_date};

    #[test]
    fn formats_currency_with_two_decimals() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(12.3), "$12.30");
        assert_eq!(format_currency(-1234.5), "-$1,234.50");
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2024-03-15"), Ok(date!(2024 - 03 - 15)));
        assert!(parse_date("15/03/2024").is_err());
    }
}
