//! Handing finished runs to the person who asked for them.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use duodok_common::Result;

use crate::summary::RunSummary;

/// Receives the exports of a completed run.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver the archive and summary of `summary` to `recipient`.
    async fn deliver(&self, summary: &RunSummary, recipient: &str) -> Result<Vec<PathBuf>>;
}

/// Copies exports into a local outbox directory, one pair of files per
/// recipient label.
#[derive(Debug, Clone)]
pub struct OutboxDelivery {
    outbox_dir: PathBuf,
}

impl OutboxDelivery {
    pub fn new<P: AsRef<Path>>(outbox_dir: P) -> Self {
        Self { outbox_dir: outbox_dir.as_ref().to_path_buf() }
    }
}

#[async_trait]
impl Delivery for OutboxDelivery {
    async fn deliver(&self, summary: &RunSummary, recipient: &str) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.outbox_dir).await?;

        let archive = self.outbox_dir.join(format!("{}_results.zip", summary.label));
        let table = self.outbox_dir.join(format!("{}_results_summary.csv", summary.label));
        fs::copy(&summary.archive_path, &archive).await?;
        fs::copy(&summary.summary_path, &table).await?;

        info!(recipient, run_id = %summary.run_id, "Delivered results to {}", self.outbox_dir.display());
        Ok(vec![archive, table])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_outbox_receives_archive_and_summary() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("someone_gmail_com");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("results_summary.csv"), "Receptor\n").unwrap();
        std::fs::write(dir.path().join("someone_gmail_com.zip"), "PK").unwrap();

        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            label: "someone_gmail_com".to_string(),
            summary_path: root.join("results_summary.csv"),
            archive_path: dir.path().join("someone_gmail_com.zip"),
            results_root: root,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            pairs: Vec::new(),
        };

        let outbox = OutboxDelivery::new(dir.path().join("outbox"));
        let delivered = outbox.deliver(&summary, "someone@gmail.com").await.unwrap();

        assert_eq!(delivered.len(), 2);
        assert!(delivered[0].ends_with("someone_gmail_com_results.zip"));
        assert_eq!(std::fs::read_to_string(&delivered[1]).unwrap(), "Receptor\n");
    }

    #[tokio::test]
    async fn test_missing_archive_is_an_error() {
        let dir = tempdir().unwrap();
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            label: "lab".to_string(),
            results_root: dir.path().join("lab"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            pairs: Vec::new(),
            summary_path: dir.path().join("lab/results_summary.csv"),
            archive_path: dir.path().join("lab.zip"),
        };
        let outbox = OutboxDelivery::new(dir.path().join("outbox"));
        assert!(outbox.deliver(&summary, "lab").await.is_err());
    }
}
