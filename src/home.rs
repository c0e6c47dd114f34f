use crate::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;

const DB_FILE: &str = "spesa.sqlite";

/// The `Home` object represents the file paths of the `$SPESA_HOME` directory
/// and the fixed locations inside it, such as the SQLite database file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Home {
    root: PathBuf,
    db: PathBuf,
}

impl Home {
    /// This will create the `spesa_home` directory, if it does not exist, and
    /// canonicalize itself.
    pub async fn new(spesa_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = spesa_home.into();
        make_dir(&maybe_relative)
            .await
            .context("Unable to create the spesa home directory")?;
        let root = fs::canonicalize(&maybe_relative).await.with_context(|| {
            format!(
                "Unable to canonicalize the path {}",
                maybe_relative.to_string_lossy()
            )
        })?;
        Ok(Self {
            db: root.join(DB_FILE),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db(&self) -> &Path {
        &self.db
    }
}

async fn make_dir(p: &Path) -> Result<()> {
    fs::create_dir_all(p)
        .await
        .with_context(|| format!("Unable to create directory at {}", p.to_string_lossy()))
}

#[tokio::test]
async fn test_home() {
    use tempfile::TempDir;
    let dir = TempDir::new().unwrap();
    let home_dir = dir.path().join("deeper").join("home");
    let home = Home::new(&home_dir).await.unwrap();
    assert!(fs::read_dir(home.root()).await.is_ok());
    assert!(home.db().ends_with("spesa.sqlite"));
}
