//! Receptor × antibody pair enumeration.

use serde::{Deserialize, Serialize};

use duodok_common::{DuodokError, Result, StructureFile};

/// One receptor combined with one antibody for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub receptor: StructureFile,
    pub antibody: StructureFile,
}

impl Pair {
    /// Name of the pair's working subdirectory, built from both selection ids
    /// without extensions, e.g. `default_r1_a1`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.receptor.folder_stem(), self.antibody.folder_stem())
    }

    pub fn ids(&self) -> (&str, &str) {
        (&self.receptor.identifier, &self.antibody.identifier)
    }
}

/// Every receptor/antibody combination exactly once, receptors in the outer loop.
///
/// Either selection being empty is an `InvalidSelection`; callers rely on this
/// check happening before any tool is started.
pub fn enumerate_pairs(receptors: &[StructureFile], antibodies: &[StructureFile]) -> Result<Vec<Pair>> {
    if receptors.is_empty() {
        return Err(DuodokError::InvalidSelection("select at least one receptor".to_string()));
    }
    if antibodies.is_empty() {
        return Err(DuodokError::InvalidSelection("select at least one antibody".to_string()));
    }

    Ok(receptors
        .iter()
        .flat_map(|r| {
            antibodies.iter().map(move |a| Pair {
                receptor: r.clone(),
                antibody: a.clone(),
            })
        })
        .collect())
}
