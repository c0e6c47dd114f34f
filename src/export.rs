//! JSON export of a period's purchases.

use crate::db::Db;
use crate::Result;
use anyhow::Context;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Fetches the purchases for `year` (all of it, or just `month` when given)
/// and writes them to `path` as a pretty-printed JSON array. Unicode text is
/// written as-is, not escaped.
///
/// If the file already exists the export is appended after its current
/// contents rather than replacing them. Returns the number of exported
/// records.
pub async fn export_json(db: &Db, year: &str, month: Option<&str>, path: &Path) -> Result<usize> {
    let purchases = match month {
        Some(month) => db.purchases_by_period(year, month).await?,
        None => db.purchases_by_year(year).await?,
    };

    let json = serde_json::to_string_pretty(&purchases)
        .context("Failed to serialize purchases to JSON")?;

    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await
        .with_context(|| format!("Unable to open {} for export", path.display()))?;
    file.write_all(json.as_bytes())
        .await
        .with_context(|| format!("Unable to write export to {}", path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("Unable to flush export to {}", path.display()))?;

    debug!(
        "Exported {} purchases to {}",
        purchases.len(),
        path.display()
    );
    Ok(purchases.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Purchase;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_export_year_includes_every_month() {
        let env = TestEnv::new().await;
        env.seed("2024", "6", &[("Καφές", "3.50")]).await;
        env.seed("2024", "7", &[("Tea", "2.00")]).await;
        env.seed("2023", "6", &[("Old", "1.00")]).await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("year.json");
        let count = export_json(env.db(), "2024", None, &path).await.unwrap();
        assert_eq!(count, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Purchase> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        // Unicode is passed through unescaped.
        assert!(text.contains("Καφές"));
        assert!(!text.contains("\\u"));
    }

    #[tokio::test]
    async fn test_export_month_filters_the_fetch() {
        let env = TestEnv::new().await;
        env.seed("2024", "6", &[("Coffee", "3.50")]).await;
        env.seed("2024", "7", &[("Tea", "2.00")]).await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("june.json");
        let count = export_json(env.db(), "2024", Some("6"), &path)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let parsed: Vec<Purchase> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0].description, "Coffee");
        assert_eq!(parsed[0].month, "6");
    }

    #[tokio::test]
    async fn test_export_appends_to_an_existing_file() {
        let env = TestEnv::new().await;
        env.seed("2024", "6", &[("Coffee", "3.50")]).await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "pre-existing").unwrap();

        export_json(env.db(), "2024", Some("6"), &path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("pre-existing"));
        assert!(text.contains("Coffee"));
    }

    #[tokio::test]
    async fn test_export_to_an_invalid_path_reports_the_path() {
        let env = TestEnv::new().await;
        let path = Path::new("/nonexistent-dir/out.json");
        let err = export_json(env.db(), "2024", None, path).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent-dir/out.json"));
    }
}
