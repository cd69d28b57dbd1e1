use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::AppResult;

/// Write raw string data to a file, overwriting any existing content.
#[tracing::instrument(name = "Writing report", level = "debug", skip(data))]
pub async fn write_file<P: AsRef<Path> + std::fmt::Debug>(output: P, data: String) -> AppResult<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&output)
        .await?;
    file.write_all(data.as_bytes()).await?;
    file.flush().await?;
    debug!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        write_file(&path, "a much longer first version".to_string())
            .await
            .unwrap();
        write_file(&path, "short".to_string()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn missing_parent_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.md");
        assert!(write_file(&path, "x".to_string()).await.is_err());
    }
}
