use crate::args::ExportArgs;
use crate::commands::Out;
use crate::db::Db;
use crate::export::export_json;
use crate::home::Home;
use crate::Result;
use std::path::PathBuf;

/// Exports a period's purchases to a JSON file. If the file exists the
/// export is appended to it.
pub async fn export(spesa_home: impl Into<PathBuf>, args: ExportArgs) -> Result<Out<()>> {
    let home = Home::new(spesa_home).await?;
    let db = Db::load(home.db()).await?;

    let year = args.year();
    let count = export_json(&db, &year, args.month(), args.out()).await?;

    let period = match args.month() {
        Some(month) => format!("{year}-{month}"),
        None => year,
    };
    Ok(Out::new_message(format!(
        "Exported {count} purchase{} for {period} to {}",
        if count == 1 { "" } else { "s" },
        args.out().display()
    )))
}
