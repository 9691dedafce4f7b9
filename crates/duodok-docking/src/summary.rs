//! Per-pair results, the run summary, and its on-disk exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use duodok_common::{DuodokError, Result};

use crate::pairs::Pair;
use crate::runner::RunStep;
use crate::stage::{PairState, Stage};

pub const SUMMARY_CSV: &str = "results_summary.csv";
pub const SUMMARY_JSON: &str = "run_summary.json";

// ── Pair results ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairStatus {
    /// All four stages completed.
    Done,
    /// Profiling failed after the affinity report was obtained.
    Partial,
    /// Stopped before any scientific field was obtained.
    Failed,
}

impl PairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairStatus::Done => "Done",
            PairStatus::Partial => "Partial",
            PairStatus::Failed => "Failed",
        }
    }
}

/// Where and why a pair stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFailure {
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResult {
    pub receptor_id: String,
    pub antibody_id: String,
    pub status: PairStatus,
    /// Last state reached: `Done` or `Failed`.
    pub state: PairState,
    pub binding_affinity: Option<f64>,
    pub dissociation_constant: Option<String>,
    pub contact_counts: BTreeMap<String, u32>,
    pub working_dir: PathBuf,
    pub artifact_paths: BTreeSet<PathBuf>,
    pub failure: Option<PairFailure>,
    /// Report fields that matched but could not be parsed.
    pub parse_errors: Vec<String>,
    pub steps: Vec<RunStep>,
}

impl PairResult {
    pub(crate) fn pending(pair: &Pair, working_dir: PathBuf) -> Self {
        Self {
            receptor_id: pair.receptor.identifier.clone(),
            antibody_id: pair.antibody.identifier.clone(),
            status: PairStatus::Failed,
            state: PairState::Pending,
            binding_affinity: None,
            dissociation_constant: None,
            contact_counts: BTreeMap::new(),
            working_dir,
            artifact_paths: BTreeSet::new(),
            failure: None,
            parse_errors: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn has_scientific_fields(&self) -> bool {
        self.binding_affinity.is_some()
            || self.dissociation_constant.is_some()
            || !self.contact_counts.is_empty()
    }

    /// `label=count` pairs joined with `;`, in label order.
    pub fn contacts_label(&self) -> String {
        self.contact_counts
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

// ── Run summary ───────────────────────────────────────────────────────────────

/// All pair results of one run plus where its exports were written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub label: String,
    pub results_root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pairs: Vec<PairResult>,
    pub summary_path: PathBuf,
    pub archive_path: PathBuf,
}

impl RunSummary {
    /// Pairs that produced at least some scientific output.
    pub fn succeeded(&self) -> impl Iterator<Item = &PairResult> {
        self.pairs.iter().filter(|p| p.status != PairStatus::Failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairResult> {
        self.pairs.iter().filter(|p| p.failure.is_some())
    }

    /// No pair produced anything. Not a crash: every pair was attempted.
    pub fn is_empty_result(&self) -> bool {
        self.succeeded().next().is_none()
    }
}

// ── Exports ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SummaryRow<'a> {
    #[serde(rename = "Receptor")]
    receptor: &'a str,
    #[serde(rename = "Antibody")]
    antibody: &'a str,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Binding Affinity (kcal/mol)")]
    binding_affinity: Option<f64>,
    #[serde(rename = "Dissociation Constant")]
    dissociation_constant: Option<&'a str>,
    #[serde(rename = "Contacts")]
    contacts: String,
    #[serde(rename = "Failed Stage")]
    failed_stage: Option<&'static str>,
    #[serde(rename = "Error")]
    error: Option<&'a str>,
    #[serde(rename = "Result Folder")]
    result_folder: String,
}

/// One CSV row per pair.
pub fn write_summary_csv(path: &Path, pairs: &[PairResult]) -> Result<()> {
    let export_err = |e: csv::Error| DuodokError::Export(format!("{}: {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(export_err)?;
    for pair in pairs {
        writer
            .serialize(SummaryRow {
                receptor: &pair.receptor_id,
                antibody: &pair.antibody_id,
                status: pair.status.as_str(),
                binding_affinity: pair.binding_affinity,
                dissociation_constant: pair.dissociation_constant.as_deref(),
                contacts: pair.contacts_label(),
                failed_stage: pair.failure.as_ref().map(|f| f.stage.as_str()),
                error: pair.failure.as_ref().map(|f| f.reason.as_str()),
                result_folder: pair.working_dir.to_string_lossy().into_owned(),
            })
            .map_err(export_err)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| DuodokError::Export(format!("{}: {e}", path.display())))
}

/// Zip every file under `src_dir`, stored relative to it. `dest_zip` is
/// skipped if it happens to live inside `src_dir`.
pub fn archive_dir(src_dir: &Path, dest_zip: &Path) -> Result<usize> {
    let zip_err = |e: zip::result::ZipError| DuodokError::Export(format!("{}: {e}", dest_zip.display()));

    let file = File::create(dest_zip)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for entry in WalkDir::new(src_dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| DuodokError::Export(e.to_string()))?;
        let path = entry.path();
        if path == dest_zip || !entry.file_type().is_file() {
            continue;
        }
        let rel = path
            .strip_prefix(src_dir)
            .map_err(|e| DuodokError::Export(e.to_string()))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name, options).map_err(zip_err)?;
        let mut f = File::open(path)?;
        std::io::copy(&mut f, &mut zip)?;
        entries += 1;
    }

    zip.finish().map_err(zip_err)?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn result(receptor: &str, antibody: &str, status: PairStatus) -> PairResult {
        PairResult {
            receptor_id: receptor.to_string(),
            antibody_id: antibody.to_string(),
            status,
            state: if status == PairStatus::Done { PairState::Done } else { PairState::Failed },
            binding_affinity: None,
            dissociation_constant: None,
            contact_counts: BTreeMap::new(),
            working_dir: PathBuf::from(format!("results/x/{receptor}_{antibody}")),
            artifact_paths: BTreeSet::new(),
            failure: None,
            parse_errors: Vec::new(),
            steps: Vec::new(),
        }
    }

    #[test]
    fn test_csv_has_one_row_per_pair() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SUMMARY_CSV);

        let mut ok = result("r1.pdb", "a1.pdb", PairStatus::Done);
        ok.binding_affinity = Some(-9.5);
        ok.contact_counts.insert("polar-polar".to_string(), 7);
        ok.contact_counts.insert("charged-charged".to_string(), 4);
        let mut bad = result("r1.pdb", "a2.pdb", PairStatus::Failed);
        bad.failure = Some(PairFailure { stage: Stage::PoseExtraction, reason: "createpl failed".to_string() });

        write_summary_csv(&path, &[ok, bad]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Receptor");
        assert_eq!(&headers[3], "Binding Affinity (kcal/mol)");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "Done");
        assert_eq!(&rows[0][3], "-9.5");
        assert_eq!(&rows[0][5], "charged-charged=4;polar-polar=7");
        assert_eq!(&rows[1][2], "Failed");
        assert_eq!(&rows[1][3], "");
        assert_eq!(&rows[1][6], "pose_extraction");
    }

    #[test]
    fn test_archive_keeps_relative_paths() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("run");
        std::fs::create_dir_all(root.join("r1_a1/plip")).unwrap();
        std::fs::write(root.join(SUMMARY_CSV), "Receptor\n").unwrap();
        std::fs::write(root.join("r1_a1/hdock.out"), "poses").unwrap();
        std::fs::write(root.join("r1_a1/plip/report.xml"), "<xml/>").unwrap();

        let dest = dir.path().join("run.zip");
        let n = archive_dir(&root, &dest).unwrap();
        assert_eq!(n, 3);

        let mut zip = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["r1_a1/hdock.out", "r1_a1/plip/report.xml", SUMMARY_CSV]);

        let mut body = String::new();
        zip.by_name("r1_a1/hdock.out").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "poses");
    }

    #[test]
    fn test_empty_result_condition() {
        let summary = |pairs: Vec<PairResult>| RunSummary {
            run_id: Uuid::new_v4(),
            label: "t".to_string(),
            results_root: PathBuf::from("results/t"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            pairs,
            summary_path: PathBuf::new(),
            archive_path: PathBuf::new(),
        };
        let all_failed = summary(vec![result("r", "a", PairStatus::Failed)]);
        assert!(all_failed.is_empty_result());
        let some_ok = summary(vec![result("r", "a", PairStatus::Failed), result("r", "b", PairStatus::Partial)]);
        assert!(!some_ok.is_empty_result());
        assert_eq!(some_ok.succeeded().count(), 1);
    }
}
