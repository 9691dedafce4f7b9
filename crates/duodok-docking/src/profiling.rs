//! Interaction profiling (stage 4). Nothing is parsed from its output.

use std::path::{Path, PathBuf};
use tracing::debug;

use duodok_common::Result;

use crate::affinity::AffinityOutput;
use crate::runner::{RunStep, Toolchain};
use crate::stage::Stage;

pub const PROFILING_DIR: &str = "plip";

#[derive(Debug, Clone)]
pub struct ProfilingOutput {
    pub output_dir: PathBuf,
}

/// Profile the complex carried forward by affinity estimation.
pub async fn profile_interactions(
    toolchain: &Toolchain,
    affinity: &AffinityOutput,
    pair_dir: &Path,
    steps: &mut Vec<RunStep>,
) -> Result<ProfilingOutput> {
    let output_dir = pair_dir.join(PROFILING_DIR);

    let vars = [
        ("complex", affinity.complex.path.to_string_lossy().into_owned()),
        ("output_dir", output_dir.to_string_lossy().into_owned()),
        ("pair_dir", pair_dir.to_string_lossy().into_owned()),
    ];
    toolchain
        .invoke(
            Stage::InteractionProfiling,
            &vars,
            pair_dir,
            vec![output_dir.clone()],
            &[output_dir.clone()],
            steps,
        )
        .await?;

    debug!("Interaction profile written to {}", output_dir.display());
    Ok(ProfilingOutput { output_dir })
}
