//! Docking and top-pose extraction (stages 1 and 2).

use std::path::{Path, PathBuf};
use tracing::debug;

use duodok_common::{Result, StructureFile};

use crate::runner::{RunStep, Toolchain};
use crate::stage::Stage;

pub const DOCKING_OUTPUT: &str = "hdock.out";
pub const COMPLEX_STRUCTURE: &str = "Protein_Peptide.pdb";

/// Declared artifact of the docking stage.
#[derive(Debug, Clone)]
pub struct DockingOutput {
    pub poses: PathBuf,
}

/// Declared artifact of pose extraction: the top-ranked complex.
#[derive(Debug, Clone)]
pub struct ComplexStructure {
    pub path: PathBuf,
}

/// Dock the receptor against the antibody, writing poses into `pair_dir`.
pub async fn dock(
    toolchain: &Toolchain,
    receptor: &StructureFile,
    antibody: &StructureFile,
    pair_dir: &Path,
    steps: &mut Vec<RunStep>,
) -> Result<DockingOutput> {
    let receptor_path = std::path::absolute(&receptor.path)?;
    let antibody_path = std::path::absolute(&antibody.path)?;
    let poses = pair_dir.join(DOCKING_OUTPUT);

    let vars = [
        ("receptor", receptor_path.to_string_lossy().into_owned()),
        ("antibody", antibody_path.to_string_lossy().into_owned()),
        ("output", poses.to_string_lossy().into_owned()),
        ("pair_dir", pair_dir.to_string_lossy().into_owned()),
    ];
    toolchain
        .invoke(Stage::Docking, &vars, pair_dir, vec![poses.clone()], &[poses.clone()], steps)
        .await?;

    debug!("Docking poses written to {}", poses.display());
    Ok(DockingOutput { poses })
}

/// Extract the single best model from the docking output as a complex.
pub async fn extract_top_pose(
    toolchain: &Toolchain,
    docking: &DockingOutput,
    pair_dir: &Path,
    steps: &mut Vec<RunStep>,
) -> Result<ComplexStructure> {
    let complex = pair_dir.join(COMPLEX_STRUCTURE);

    let vars = [
        ("docking_output", docking.poses.to_string_lossy().into_owned()),
        ("complex", complex.to_string_lossy().into_owned()),
        ("pair_dir", pair_dir.to_string_lossy().into_owned()),
    ];
    toolchain
        .invoke(Stage::PoseExtraction, &vars, pair_dir, vec![complex.clone()], &[complex.clone()], steps)
        .await?;

    debug!("Top complex written to {}", complex.display());
    Ok(ComplexStructure { path: complex })
}
