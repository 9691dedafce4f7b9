//! Binding-affinity estimation (stage 3).

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use duodok_common::Result;

use crate::docking::ComplexStructure;
use crate::report::{parse_report, AffinityReport};
use crate::runner::{RunStep, Toolchain};
use crate::stage::Stage;

pub const AFFINITY_REPORT: &str = "prodigy_results.txt";

/// Declared artifacts of affinity estimation: the saved report and the
/// complex it was computed on.
#[derive(Debug, Clone)]
pub struct AffinityOutput {
    pub report_path: PathBuf,
    pub complex: ComplexStructure,
    pub report: AffinityReport,
}

/// Run the affinity tool on the complex, keep its stdout as the report
/// artifact and parse it.
pub async fn estimate_affinity(
    toolchain: &Toolchain,
    complex: &ComplexStructure,
    pair_dir: &Path,
    steps: &mut Vec<RunStep>,
) -> Result<AffinityOutput> {
    let report_path = pair_dir.join(AFFINITY_REPORT);

    let vars = [
        ("complex", complex.path.to_string_lossy().into_owned()),
        ("pair_dir", pair_dir.to_string_lossy().into_owned()),
    ];
    let output = toolchain
        .invoke(
            Stage::AffinityEstimation,
            &vars,
            pair_dir,
            vec![report_path.clone(), complex.path.clone()],
            &[],
            steps,
        )
        .await?;

    if let Err(e) = fs::write(&report_path, &output.stdout).await {
        if let Some(step) = steps.last_mut() {
            step.succeeded = false;
            step.error = Some(format!("could not save report: {e}"));
        }
        return Err(e.into());
    }

    let report = parse_report(&output.stdout);
    for err in &report.field_errors {
        warn!(field = %err.field, "Report field skipped: {}", err);
    }
    if report.binding_affinity.is_none() && report.field_errors.is_empty() {
        debug!("Report has no binding affinity line");
    }

    Ok(AffinityOutput {
        report_path,
        complex: complex.clone(),
        report,
    })
}
