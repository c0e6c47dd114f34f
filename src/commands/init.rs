use crate::commands::Out;
use crate::db::Db;
use crate::home::Home;
use crate::Result;
use std::path::PathBuf;

/// Creates the spesa home directory and initializes an empty purchases
/// database inside it.
pub async fn init(spesa_home: impl Into<PathBuf>) -> Result<Out<()>> {
    let home = Home::new(spesa_home).await?;
    let _db = Db::init(home.db()).await?;
    Ok(Out::new_message(format!(
        "Initialized an empty purchases database at {}",
        home.db().display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_the_database() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("spesa");
        let out = init(&home).await.unwrap();
        assert!(out.message().contains("spesa.sqlite"));
        assert!(home.join("spesa.sqlite").is_file());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("spesa");
        init(&home).await.unwrap();
        assert!(init(&home).await.is_err());
    }
}
