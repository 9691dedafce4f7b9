//! Run aggregation for the docking pipeline.
//!
//! Orchestrates one run:
//!   1. Reject an empty pair list before any tool starts
//!   2. For each pair, strictly one after another:
//!      docking → pose extraction → affinity estimation → interaction profiling
//!   3. Record a `PairResult` per pair, whatever happened to it
//!   4. Export the summary (CSV + JSON) and archive the run directory
//!
//! A failing stage only ends its own pair. Failing to write the summary or
//! archive ends the run, since there is no partial-summary contract.

use chrono::Utc;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use duodok_common::{DuodokError, Result, StructureCategory, StructureFile};

use crate::affinity::estimate_affinity;
use crate::docking::{dock, extract_top_pose};
use crate::pairs::{enumerate_pairs, Pair};
use crate::profiling::profile_interactions;
use crate::runner::Toolchain;
use crate::stage::{PairState, Stage};
use crate::structures::StructureStore;
use crate::summary::{
    archive_dir, write_summary_csv, write_summary_json, PairFailure, PairResult, PairStatus, RunSummary,
    SUMMARY_CSV, SUMMARY_JSON,
};

// ── Progress events ───────────────────────────────────────────────────────────

/// Emitted on every pair state transition (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct RunProgress {
    pub run_id: Uuid,
    /// 1-based position of the pair in the run.
    pub index: usize,
    pub total: usize,
    pub receptor: String,
    pub antibody: String,
    pub state: PairState,
    pub message: String,
}

struct ProgressSink {
    run_id: Uuid,
    total: usize,
    tx: Option<broadcast::Sender<RunProgress>>,
}

impl ProgressSink {
    fn emit(&self, index: usize, pair: &Pair, state: PairState, message: String) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(RunProgress {
                run_id: self.run_id,
                index,
                total: self.total,
                receptor: pair.receptor.identifier.clone(),
                antibody: pair.antibody.identifier.clone(),
                state,
                message,
            });
        }
    }

    /// Move `state` to the next stage and announce it.
    fn enter_next(&self, index: usize, pair: &Pair, state: &mut PairState) {
        *state = state.advance();
        debug!(pair = %pair.dir_name(), "Entering {}", state);
        self.emit(index, pair, *state, state.to_string());
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Drives the fixed four-stage pipeline over a list of pairs.
pub struct RunAggregator {
    results_dir: PathBuf,
    toolchain: Toolchain,
}

impl RunAggregator {
    pub fn new<P: AsRef<Path>>(results_dir: P, toolchain: Toolchain) -> Self {
        Self {
            results_dir: results_dir.as_ref().to_path_buf(),
            toolchain,
        }
    }

    /// Process every pair and build the run summary.
    ///
    /// Results land in `results_dir/<label>/`, one subdirectory per pair,
    /// with the archive written next to that folder as `<label>.zip`.
    #[instrument(skip(self, pairs, progress_tx), fields(pair_count = pairs.len()))]
    pub async fn run(
        &self,
        label: &str,
        pairs: &[Pair],
        progress_tx: Option<broadcast::Sender<RunProgress>>,
    ) -> Result<RunSummary> {
        if pairs.is_empty() {
            return Err(DuodokError::InvalidSelection("no receptor/antibody pairs to process".to_string()));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let label = sanitize_label(label);
        let results_root = std::path::absolute(self.results_dir.join(&label))?;
        fs::create_dir_all(&results_root).await?;

        info!(run_id = %run_id, root = %results_root.display(), "Starting docking run over {} pairs", pairs.len());

        let progress = ProgressSink { run_id, total: pairs.len(), tx: progress_tx };
        let mut results = Vec::with_capacity(pairs.len());
        for (i, pair) in pairs.iter().enumerate() {
            results.push(self.process_pair(i + 1, pair, &results_root, &progress).await);
        }

        let mut archive_name: OsString = results_root.as_os_str().to_owned();
        archive_name.push(".zip");

        let summary = RunSummary {
            run_id,
            label,
            summary_path: results_root.join(SUMMARY_CSV),
            archive_path: PathBuf::from(archive_name),
            results_root,
            started_at,
            finished_at: Utc::now(),
            pairs: results,
        };

        let exported = summary.clone();
        let entries = tokio::task::spawn_blocking(move || -> Result<usize> {
            write_summary_csv(&exported.summary_path, &exported.pairs)?;
            write_summary_json(&exported.results_root.join(SUMMARY_JSON), &exported)?;
            archive_dir(&exported.results_root, &exported.archive_path)
        })
        .await
        .map_err(|e| DuodokError::Export(format!("export task failed: {e}")))??;

        let ok = summary.succeeded().count();
        info!(
            run_id = %run_id,
            succeeded = ok,
            failed = summary.pairs.len() - ok,
            archive_entries = entries,
            "Run complete; archive at {}",
            summary.archive_path.display()
        );
        Ok(summary)
    }

    async fn process_pair(
        &self,
        index: usize,
        pair: &Pair,
        results_root: &Path,
        progress: &ProgressSink,
    ) -> PairResult {
        let (receptor, antibody) = pair.ids();
        let pair_dir = results_root.join(pair.dir_name());
        let mut result = PairResult::pending(pair, pair_dir.clone());
        let mut state = PairState::Pending;

        info!(pair = %pair.dir_name(), "Processing {} with {} ({}/{})", receptor, antibody, index, progress.total);
        progress.emit(index, pair, state, format!("Processing {receptor} with {antibody}"));

        match self.drive(index, pair, &pair_dir, &mut result, &mut state, progress).await {
            Ok(()) => {
                result.state = PairState::Done;
                result.status = PairStatus::Done;
                progress.emit(index, pair, PairState::Done, "Pair complete".to_string());
            }
            Err(err) => {
                let stage = state.stage().unwrap_or(Stage::Docking);
                warn!(pair = %pair.dir_name(), stage = %stage, "Pair failed: {}", err);

                result.state = PairState::Failed;
                result.status = if stage == Stage::InteractionProfiling {
                    PairStatus::Partial
                } else {
                    PairStatus::Failed
                };
                result.failure = Some(PairFailure { stage, reason: err.to_string() });
                progress.emit(index, pair, PairState::Failed, format!("{stage} failed: {err}"));
            }
        }
        result
    }

    async fn drive(
        &self,
        index: usize,
        pair: &Pair,
        pair_dir: &Path,
        result: &mut PairResult,
        state: &mut PairState,
        progress: &ProgressSink,
    ) -> Result<()> {
        progress.enter_next(index, pair, state);
        reset_pair_dir(pair_dir).await?;
        let docking = dock(&self.toolchain, &pair.receptor, &pair.antibody, pair_dir, &mut result.steps).await?;
        result.artifact_paths.insert(docking.poses.clone());

        progress.enter_next(index, pair, state);
        let complex = extract_top_pose(&self.toolchain, &docking, pair_dir, &mut result.steps).await?;
        result.artifact_paths.insert(complex.path.clone());

        progress.enter_next(index, pair, state);
        let affinity = estimate_affinity(&self.toolchain, &complex, pair_dir, &mut result.steps).await?;
        result.artifact_paths.insert(affinity.report_path.clone());
        result.binding_affinity = affinity.report.binding_affinity;
        result.dissociation_constant = affinity.report.dissociation_constant.clone();
        result.contact_counts = affinity.report.contact_counts.clone();
        result.parse_errors = affinity.report.field_errors.iter().map(|e| e.to_string()).collect();

        progress.enter_next(index, pair, state);
        let profile = profile_interactions(&self.toolchain, &affinity, pair_dir, &mut result.steps).await?;
        result.artifact_paths.insert(profile.output_dir);

        Ok(())
    }
}

/// Start a pair from scratch: stale artifacts from an earlier run with the
/// same identifiers must not satisfy this run's artifact checks.
async fn reset_pair_dir(pair_dir: &Path) -> Result<()> {
    match fs::remove_dir_all(pair_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::create_dir_all(pair_dir).await?;
    Ok(())
}

/// Folder-safe form of a run label: `@` and `.` (and anything else outside
/// `[A-Za-z0-9_-]`) become `_`.
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

// ── Facade ────────────────────────────────────────────────────────────────────

/// Everything the surrounding application needs: catalog, pairing, runs.
pub struct DockingPipeline {
    store: StructureStore,
    aggregator: RunAggregator,
}

impl DockingPipeline {
    pub fn new(store: StructureStore, aggregator: RunAggregator) -> Self {
        Self { store, aggregator }
    }

    pub fn store(&self) -> &StructureStore {
        &self.store
    }

    pub async fn list_structures(&self, category: StructureCategory) -> Result<Vec<StructureFile>> {
        self.store.list_structures(category).await
    }

    /// Resolve selection strings and pair them up. Empty selections are
    /// rejected before anything is looked up.
    pub async fn enumerate_pairs(&self, receptors: &[String], antibodies: &[String]) -> Result<Vec<Pair>> {
        if receptors.is_empty() || antibodies.is_empty() {
            return enumerate_pairs(&[], &[]);
        }
        let receptors = self.store.resolve_all(StructureCategory::Receptor, receptors).await?;
        let antibodies = self.store.resolve_all(StructureCategory::Antibody, antibodies).await?;
        enumerate_pairs(&receptors, &antibodies)
    }

    pub async fn run(
        &self,
        label: &str,
        pairs: &[Pair],
        progress_tx: Option<broadcast::Sender<RunProgress>>,
    ) -> Result<RunSummary> {
        self.aggregator.run(label, pairs, progress_tx).await
    }
}
