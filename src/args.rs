//! These structs provide the CLI interface for the spesa CLI.

use clap::{Parser, Subcommand};
use chrono::Datelike;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// spesa: A command-line ledger for monthly purchases.
///
/// Purchases are recorded per year/month in a local SQLite database. You edit
/// one month at a time in an interactive session and save the accumulated
/// changes as a single batch, and you can export a year (or a single month)
/// to a JSON file.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the purchases database.
    ///
    /// This is the first command you should run. By default the data lives in
    /// $HOME/spesa; pass --spesa-home (or set SPESA_HOME) to put it
    /// somewhere else.
    Init,
    /// Print the purchases recorded for a period and their total.
    List(ListArgs),
    /// Edit one month's purchases interactively and save them as a batch.
    Edit(EditArgs),
    /// Export a year's (or a single month's) purchases to a JSON file.
    ///
    /// If the target file already exists the export is appended to it.
    Export(ExportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate
    /// for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where spesa data is held. Defaults to ~/spesa
    #[arg(long, env = "SPESA_HOME")]
    spesa_home: Option<PathBuf>,
}

impl Common {
    pub fn new(log_level: LevelFilter, spesa_home: Option<PathBuf>) -> Self {
        Self {
            log_level,
            spesa_home,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn spesa_home(&self) -> PathBuf {
        self.spesa_home.clone().unwrap_or_else(default_spesa_home)
    }
}

/// Args for the `spesa list` command.
#[derive(Debug, Parser, Clone)]
pub struct ListArgs {
    /// The 4-digit year to list, e.g. 2024. Defaults to the current year.
    #[arg(long, value_parser = parse_year)]
    year: Option<String>,

    /// The month to list, 1-12. When omitted the whole year is listed.
    #[arg(long, value_parser = parse_month)]
    month: Option<String>,
}

impl ListArgs {
    pub fn new(year: Option<String>, month: Option<String>) -> Self {
        Self { year, month }
    }

    pub fn year(&self) -> String {
        self.year.clone().unwrap_or_else(current_year)
    }

    pub fn month(&self) -> Option<&str> {
        self.month.as_deref()
    }
}

/// Args for the `spesa edit` command.
#[derive(Debug, Parser, Clone)]
pub struct EditArgs {
    /// The 4-digit year of the period to edit. Defaults to the current year.
    #[arg(long, value_parser = parse_year)]
    year: Option<String>,

    /// The month of the period to edit, 1-12. Defaults to the current month.
    #[arg(long, value_parser = parse_month)]
    month: Option<String>,
}

impl EditArgs {
    pub fn new(year: Option<String>, month: Option<String>) -> Self {
        Self { year, month }
    }

    pub fn year(&self) -> String {
        self.year.clone().unwrap_or_else(current_year)
    }

    pub fn month(&self) -> String {
        self.month.clone().unwrap_or_else(current_month)
    }
}

/// Args for the `spesa export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    /// The 4-digit year to export. Defaults to the current year.
    #[arg(long, value_parser = parse_year)]
    year: Option<String>,

    /// Restrict the export to one month, 1-12.
    #[arg(long, value_parser = parse_month)]
    month: Option<String>,

    /// The JSON file to write. If it exists, the export is appended.
    #[arg(long)]
    out: PathBuf,
}

impl ExportArgs {
    pub fn new(year: Option<String>, month: Option<String>, out: impl Into<PathBuf>) -> Self {
        Self {
            year,
            month,
            out: out.into(),
        }
    }

    pub fn year(&self) -> String {
        self.year.clone().unwrap_or_else(current_year)
    }

    pub fn month(&self) -> Option<&str> {
        self.month.as_deref()
    }

    pub fn out(&self) -> &PathBuf {
        &self.out
    }
}

/// Validates a year argument: exactly four digits, e.g. "2024".
pub(crate) fn parse_year(s: &str) -> std::result::Result<String, String> {
    let s = s.trim();
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err(format!("'{s}' is not a 4-digit year"))
    }
}

/// Validates a month argument and normalizes it to the unpadded 1-12 form
/// periods are keyed by, so "06" and "6" land in the same bucket.
pub(crate) fn parse_month(s: &str) -> std::result::Result<String, String> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{s}' is not a month between 1 and 12"));
    }
    match s.parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Ok(m.to_string()),
        _ => Err(format!("'{s}' is not a month between 1 and 12")),
    }
}

/// The current year as a 4-digit string, matching how periods are keyed.
pub(crate) fn current_year() -> String {
    chrono::Local::now().year().to_string()
}

/// The current month as a 1-2 digit unpadded string.
pub(crate) fn current_month() -> String {
    chrono::Local::now().month().to_string()
}

fn default_spesa_home() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join("spesa"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --spesa-home or SPESA_HOME instead of relying on the default \
                spesa home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("spesa")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_period_shape() {
        let year = current_year();
        assert_eq!(year.len(), 4);
        assert!(year.parse::<i32>().is_ok());

        let month = current_month();
        let m: u32 = month.parse().unwrap();
        assert!((1..=12).contains(&m));
        assert!(!month.starts_with('0'));
    }

    #[test]
    fn test_args_parse_edit_defaults() {
        let args = Args::parse_from(["spesa", "edit"]);
        match args.command() {
            Command::Edit(edit) => {
                assert_eq!(edit.year(), current_year());
                assert_eq!(edit.month(), current_month());
            }
            other => panic!("expected edit, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_year_requires_four_digits() {
        assert_eq!(parse_year("2024").unwrap(), "2024");
        assert_eq!(parse_year(" 2024 ").unwrap(), "2024");
        assert!(parse_year("24").is_err());
        assert!(parse_year("20x4").is_err());
        assert!(parse_year("20245").is_err());
    }

    #[test]
    fn test_parse_month_normalizes_and_validates() {
        assert_eq!(parse_month("6").unwrap(), "6");
        assert_eq!(parse_month("06").unwrap(), "6");
        assert_eq!(parse_month("12").unwrap(), "12");
        assert!(parse_month("0").is_err());
        assert!(parse_month("13").is_err());
        assert!(parse_month("+6").is_err());
        assert!(parse_month("six").is_err());
        assert!(parse_month("").is_err());
    }

    #[test]
    fn test_args_normalize_padded_month_and_reject_bad_periods() {
        let args = Args::parse_from(["spesa", "list", "--year", "2024", "--month", "06"]);
        match args.command() {
            Command::List(list) => assert_eq!(list.month(), Some("6")),
            other => panic!("expected list, got {other:?}"),
        }

        assert!(Args::try_parse_from(["spesa", "list", "--month", "13"]).is_err());
        assert!(Args::try_parse_from(["spesa", "edit", "--year", "24"]).is_err());
        assert!(Args::try_parse_from([
            "spesa", "export", "--month", "0", "--out", "x.json"
        ])
        .is_err());
    }

    #[test]
    fn test_args_parse_export() {
        let args = Args::parse_from([
            "spesa", "export", "--year", "2024", "--month", "6", "--out", "june.json",
        ]);
        match args.command() {
            Command::Export(export) => {
                assert_eq!(export.year(), "2024");
                assert_eq!(export.month(), Some("6"));
                assert_eq!(export.out(), &PathBuf::from("june.json"));
            }
            other => panic!("expected export, got {other:?}"),
        }
    }
}
