//! Human-readable winner log.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// One line of the winner log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerLine {
    pub at: DateTime<Utc>,
    /// Round label, `-` when the caller did not supply one
    pub round_id: String,
    pub winner: String,
    pub seed: String,
}

impl WinnerLine {
    pub fn new(round_id: Option<String>, winner: impl Into<String>, seed: Option<String>) -> Self {
        Self {
            at: Utc::now(),
            round_id: round_id.unwrap_or_else(|| "-".to_string()),
            winner: winner.into(),
            seed: seed.unwrap_or_default(),
        }
    }
}

impl fmt::Display for WinnerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Round {} | SimWinner: {} | seed={}",
            self.at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.round_id,
            self.winner,
            self.seed
        )
    }
}

/// Append-only sink for winner lines.
#[async_trait]
pub trait WinnerSink: Send + Sync {
    async fn record(&self, line: &WinnerLine) -> Result<()>;

    /// Where lines end up, reported back to API callers.
    fn location(&self) -> String;
}

/// Appends winner lines to a text file, creating parent directories.
pub struct FileWinnerLog {
    path: PathBuf,
}

impl FileWinnerLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WinnerSink for FileWinnerLog {
    async fn record(&self, line: &WinnerLine) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;

        tracing::info!(file = %self.path.display(), "{}", line);
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
