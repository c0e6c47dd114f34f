//! The interactive edit session.
//!
//! One month's purchases are loaded into an in-memory working set and edited
//! with line commands. Nothing reaches the database until `save` is issued
//! and confirmed; leaving the session (or switching period) discards any
//! unsaved changes.

use crate::args::{parse_month, parse_year, EditArgs};
use crate::commands::Out;
use crate::db::Db;
use crate::home::Home;
use crate::model::{Field, SharedPurchase};
use crate::session::Session;
use crate::Result;
use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use std::path::PathBuf;

const HELP: &str = "\
Commands:
  list                      show the working set
  total                     show the sum of the working set's prices
  add <price> <description> add a purchase (saved with this period's year/month)
  set <n> <field> <value>   edit row n in place; field is 'description' or 'price'
  rm <n>                    remove row n (persisted rows are deleted on save)
  period <year> <month>     switch period, discarding unsaved changes
  save                      write all changes to the database (asks first)
  quit                      leave without saving anything further";

/// Runs the interactive edit session on stdin/stdout.
pub async fn edit(spesa_home: impl Into<PathBuf>, args: EditArgs) -> Result<Out<()>> {
    let home = Home::new(spesa_home).await?;
    let db = Db::load(home.db()).await?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    edit_loop(&db, args.year(), args.month(), &mut input, &mut output).await
}

/// The command loop, with its input and output abstracted for testing.
pub(crate) async fn edit_loop(
    db: &Db,
    year: String,
    month: String,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<Out<()>> {
    let mut session = Session::load(db, year, month).await?;
    writeln!(
        output,
        "Editing {}-{} ({} purchases). Type 'help' for commands.",
        session.year(),
        session.month(),
        session.purchases().len()
    )?;

    loop {
        write!(output, "spesa> ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "help" => writeln!(output, "{HELP}")?,
            "list" => print_rows(&session, output)?,
            "total" => writeln!(output, "Total: {}", session.recompute_expenses())?,
            "add" => match parse_add(rest) {
                Ok((price, description)) => {
                    session.add(description, price);
                    writeln!(output, "Added (will be saved to {}-{})", session.year(), session.month())?;
                }
                Err(msg) => writeln!(output, "{msg}")?,
            },
            "set" => match parse_set(&session, rest) {
                Ok(()) => writeln!(output, "Changed (unsaved)")?,
                Err(msg) => writeln!(output, "{msg}")?,
            },
            "rm" => match row_at(&session, rest) {
                Ok(record) => {
                    let persisted = record.is_persisted();
                    session.remove(&record);
                    if persisted {
                        writeln!(output, "Removed; the row will be deleted on save")?;
                    } else {
                        writeln!(output, "Removed (was never saved)")?;
                    }
                }
                Err(msg) => writeln!(output, "{msg}")?,
            },
            "period" => match parse_period(rest) {
                Ok((year, month)) => match session.select_period(db, year, month).await {
                    Ok(()) => writeln!(
                        output,
                        "Now editing {}-{} ({} purchases); unsaved changes were discarded",
                        session.year(),
                        session.month(),
                        session.purchases().len()
                    )?,
                    // The working set is untouched on failure; keep editing.
                    Err(e) => writeln!(output, "Switch failed: {e:#}")?,
                },
                Err(msg) => writeln!(output, "{msg}")?,
            },
            "save" => {
                if !session.has_changes() {
                    writeln!(output, "Nothing to save")?;
                    continue;
                }
                write!(
                    output,
                    "Save changes to {}-{}? [y/N] ",
                    session.year(),
                    session.month()
                )?;
                output.flush()?;
                let mut answer = String::new();
                input.read_line(&mut answer)?;
                if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                    writeln!(output, "Save cancelled")?;
                    continue;
                }
                match session.save(db).await {
                    Ok(outcome) => writeln!(
                        output,
                        "Saved: {} updated, {} inserted, {} deleted",
                        outcome.updated, outcome.inserted, outcome.deleted
                    )?,
                    Err(e) => writeln!(output, "Save failed: {e:#}")?,
                }
            }
            "quit" | "exit" => break,
            other => writeln!(output, "Unknown command '{other}', type 'help'")?,
        }
    }

    Ok(Out::new_message(format!(
        "Left the edit session for {}-{}",
        session.year(),
        session.month()
    )))
}

fn print_rows(session: &Session, output: &mut dyn Write) -> Result<()> {
    let records = session.purchases().records();
    if records.is_empty() {
        writeln!(output, "No purchases in the working set")?;
        return Ok(());
    }
    for (ix, record) in records.iter().enumerate() {
        let marker = if record.is_persisted() { "" } else { " (new)" };
        writeln!(
            output,
            "  {:>3}. {:>10}  {}{marker}",
            ix + 1,
            record.price(),
            record.description()
        )?;
    }
    Ok(())
}

fn parse_add(rest: &str) -> std::result::Result<(Decimal, String), String> {
    let (price, description) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| "Usage: add <price> <description>".to_string())?;
    let price: Decimal = price
        .parse()
        .map_err(|_| format!("'{price}' is not a valid price"))?;
    let description = description.trim();
    if description.is_empty() {
        return Err("Usage: add <price> <description>".to_string());
    }
    Ok((price, description.to_string()))
}

/// Parses `<year> <month>` for the `period` command, normalizing the month
/// to the unpadded form periods are keyed by.
fn parse_period(rest: &str) -> std::result::Result<(String, String), String> {
    let (year, month) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| "Usage: period <year> <month>".to_string())?;
    Ok((parse_year(year)?, parse_month(month)?))
}

fn parse_set(session: &Session, rest: &str) -> std::result::Result<(), String> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let (Some(index), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err("Usage: set <n> <field> <value>".to_string());
    };
    let record = row_at(session, index)?;
    let field: Field = field
        .parse()
        .map_err(|_| format!("Unknown field '{field}'"))?;
    match field {
        Field::Description => record.set_description(value.trim()),
        Field::Price => {
            let price: Decimal = value
                .trim()
                .parse()
                .map_err(|_| format!("'{value}' is not a valid price"))?;
            record.set_price(price);
        }
        // The id belongs to the database and the period is stamped at save
        // time, so none of these are editable here.
        Field::Id | Field::Year | Field::Month => {
            return Err(format!("The {field} field cannot be edited"));
        }
    }
    Ok(())
}

/// Looks up a working-set row by its 1-based display index.
fn row_at(session: &Session, index: &str) -> std::result::Result<SharedPurchase, String> {
    let index = index.trim();
    let n: usize = index
        .parse()
        .map_err(|_| format!("'{index}' is not a row number"))?;
    n.checked_sub(1)
        .and_then(|ix| session.purchases().get(ix))
        .ok_or_else(|| format!("No row {n} in the working set"))
}
