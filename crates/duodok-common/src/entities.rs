/// Structure entity types shared between the docking core and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Selection strings with this prefix refer to the built-in copy of a structure.
pub const DEFAULT_SELECTION_PREFIX: &str = "default_";

// ---------------------------------------------------------------------------
// Category / origin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureCategory {
    Receptor,
    Antibody,
}

impl StructureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureCategory::Receptor => "receptor",
            StructureCategory::Antibody => "antibody",
        }
    }
}

impl fmt::Display for StructureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StructureCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "receptor" | "receptors" => Ok(StructureCategory::Receptor),
            "antibody" | "antibodies" => Ok(StructureCategory::Antibody),
            other => Err(format!("unknown structure category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureOrigin {
    /// Shipped with the deployment.
    Default,
    /// Uploaded by a user.
    User,
}

// ---------------------------------------------------------------------------
// Structure file
// ---------------------------------------------------------------------------

/// A receptor or antibody structure on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureFile {
    pub category: StructureCategory,
    pub origin: StructureOrigin,
    /// File name, unique within category + origin.
    pub identifier: String,
    pub path: PathBuf,
}

impl StructureFile {
    /// File name without the extension, used to name per-pair directories.
    pub fn stem(&self) -> &str {
        Path::new(&self.identifier)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.identifier)
    }

    /// Stem of the selection id; defaults keep their prefix so they never
    /// share a pair folder with an upload of the same name.
    pub fn folder_stem(&self) -> String {
        match self.origin {
            StructureOrigin::Default => format!("{DEFAULT_SELECTION_PREFIX}{}", self.stem()),
            StructureOrigin::User => self.stem().to_string(),
        }
    }

    /// The selection string the CLI accepts for this structure.
    pub fn selection_id(&self) -> String {
        match self.origin {
            StructureOrigin::Default => format!("{DEFAULT_SELECTION_PREFIX}{}", self.identifier),
            StructureOrigin::User => self.identifier.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(origin: StructureOrigin, id: &str) -> StructureFile {
        StructureFile {
            category: StructureCategory::Receptor,
            origin,
            identifier: id.to_string(),
            path: PathBuf::from("receptors").join(id),
        }
    }

    #[test]
    fn test_stem_drops_extension() {
        assert_eq!(structure(StructureOrigin::User, "1abc.pdb").stem(), "1abc");
        assert_eq!(structure(StructureOrigin::User, "noext").stem(), "noext");
    }

    #[test]
    fn test_selection_id_prefixes_defaults() {
        assert_eq!(structure(StructureOrigin::Default, "r1.pdb").selection_id(), "default_r1.pdb");
        assert_eq!(structure(StructureOrigin::User, "r1.pdb").selection_id(), "r1.pdb");
    }

    #[test]
    fn test_folder_stem_keeps_origin() {
        assert_eq!(structure(StructureOrigin::Default, "r1.pdb").folder_stem(), "default_r1");
        assert_eq!(structure(StructureOrigin::User, "r1.pdb").folder_stem(), "r1");
    }

    #[test]
    fn test_category_parses_plural_forms() {
        assert_eq!("Antibodies".parse::<StructureCategory>().unwrap(), StructureCategory::Antibody);
        assert_eq!("receptor".parse::<StructureCategory>().unwrap(), StructureCategory::Receptor);
        assert!("ligand".parse::<StructureCategory>().is_err());
    }
}
