use crate::args::ListArgs;
use crate::commands::Out;
use crate::db::Db;
use crate::home::Home;
use crate::model::Purchase;
use crate::Result;
use rust_decimal::Decimal;
use std::fmt::Write;
use std::path::PathBuf;

/// Prints the purchases recorded for a period (a whole year, or one month
/// when `--month` is given) along with their total.
pub async fn list(spesa_home: impl Into<PathBuf>, args: ListArgs) -> Result<Out<Vec<Purchase>>> {
    let home = Home::new(spesa_home).await?;
    let db = Db::load(home.db()).await?;

    let year = args.year();
    let purchases = match args.month() {
        Some(month) => db.purchases_by_period(&year, month).await?,
        None => db.purchases_by_year(&year).await?,
    };

    let period = match args.month() {
        Some(month) => format!("{year}-{month}"),
        None => year.clone(),
    };
    Ok(Out::new(render(&period, &purchases), purchases))
}

fn render(period: &str, purchases: &[Purchase]) -> String {
    if purchases.is_empty() {
        return format!("No purchases recorded for {period}");
    }
    let mut text = format!("Purchases for {period}:\n");
    let mut total = Decimal::ZERO;
    for p in purchases {
        total += p.price;
        // Write into a String cannot fail.
        let _ = writeln!(
            text,
            "  {:>6}  {}-{:<2}  {:>10}  {}",
            p.id, p.year, p.month, p.price, p.description
        );
    }
    let _ = write!(text, "Total: {total} ({} purchases)", purchases.len());
    text
}
