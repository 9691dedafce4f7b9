//! Tool and storage configuration for the docking pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use duodok_common::{DuodokError, Result};
use regex::Regex;

use crate::stage::Stage;

// ── Tool specs ────────────────────────────────────────────────────────────────

/// An external program plus its argument template.
///
/// Each template argument may contain `{name}` placeholders which are
/// substituted per argument. Nothing is ever passed through a shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolSpec {
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Display name used in logs and error messages.
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// Expand the argument template. Unknown placeholders are a config error.
    pub fn render(&self, vars: &[(&str, String)]) -> Result<Vec<String>> {
        let mut rendered = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let mut missing = None;
            let out = placeholder_re().replace_all(arg, |caps: &regex::Captures<'_>| {
                let key = &caps[1];
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, v)) => v.clone(),
                    None => {
                        missing.get_or_insert_with(|| key.to_string());
                        String::new()
                    }
                }
            });
            if let Some(key) = missing {
                return Err(DuodokError::Config(format!(
                    "unknown placeholder {{{key}}} in arguments for {}",
                    self.name()
                )));
            }
            rendered.push(out.into_owned());
        }
        Ok(rendered)
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"))
}

/// The four external tools, one per pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Per-invocation timeout. Unset or zero blocks until the tool exits.
    pub timeout_secs: Option<u64>,
    pub docking: ToolSpec,
    pub pose_extraction: ToolSpec,
    pub affinity: ToolSpec,
    pub profiling: ToolSpec,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            docking: ToolSpec::new("./hdock", &["{receptor}", "{antibody}", "-out", "{output}"]),
            pose_extraction: ToolSpec::new(
                "./createpl",
                &["{docking_output}", "{complex}", "-nmax", "1", "-complex", "-models"],
            ),
            affinity: ToolSpec::new("prodigy", &["{complex}"]),
            profiling: ToolSpec::new("plip", &["-f", "{complex}", "-o", "{output_dir}"]),
        }
    }
}

impl ToolchainConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    pub fn spec(&self, stage: Stage) -> &ToolSpec {
        match stage {
            Stage::Docking => &self.docking,
            Stage::PoseExtraction => &self.pose_extraction,
            Stage::AffinityEstimation => &self.affinity,
            Stage::InteractionProfiling => &self.profiling,
        }
    }
}

// ── Storage layout ────────────────────────────────────────────────────────────

/// Folder per structure category and origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    pub receptor_dir: PathBuf,
    pub default_receptor_dir: PathBuf,
    pub antibody_dir: PathBuf,
    pub default_antibody_dir: PathBuf,
    /// Required file extension, without the dot.
    pub extension: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            receptor_dir: PathBuf::from("receptors"),
            default_receptor_dir: PathBuf::from("receptors/default"),
            antibody_dir: PathBuf::from("antibodies"),
            default_antibody_dir: PathBuf::from("antibodies/default"),
            extension: "pdb".to_string(),
        }
    }
}

impl StoreLayout {
    /// Lay out all four folders under one root directory.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            receptor_dir: root.join("receptors"),
            default_receptor_dir: root.join("receptors").join("default"),
            antibody_dir: root.join("antibodies"),
            default_antibody_dir: root.join("antibodies").join("default"),
            extension: "pdb".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_each_argument() {
        let spec = ToolSpec::new("./hdock", &["{receptor}", "{antibody}", "-out", "{output}"]);
        let args = spec
            .render(&[
                ("receptor", "/r/r1.pdb".to_string()),
                ("antibody", "/a/a1.pdb".to_string()),
                ("output", "/out/hdock.out".to_string()),
            ])
            .unwrap();
        assert_eq!(args, vec!["/r/r1.pdb", "/a/a1.pdb", "-out", "/out/hdock.out"]);
    }

    #[test]
    fn test_render_keeps_spaces_inside_one_argument() {
        let spec = ToolSpec::new("prodigy", &["--input={complex}"]);
        let args = spec.render(&[("complex", "/tmp/my dir/c.pdb".to_string())]).unwrap();
        assert_eq!(args, vec!["--input=/tmp/my dir/c.pdb"]);
    }

    #[test]
    fn test_render_rejects_unknown_placeholder() {
        let spec = ToolSpec::new("plip", &["-f", "{complx}"]);
        let err = spec.render(&[("complex", "c.pdb".to_string())]).unwrap_err();
        assert!(matches!(err, DuodokError::Config(_)));
        assert!(err.to_string().contains("{complx}"));
    }

    #[test]
    fn test_default_toolchain_matches_pipeline_order() {
        let cfg = ToolchainConfig::default();
        assert_eq!(cfg.spec(Stage::Docking).name(), "hdock");
        assert_eq!(cfg.spec(Stage::PoseExtraction).name(), "createpl");
        assert_eq!(cfg.spec(Stage::AffinityEstimation).name(), "prodigy");
        assert_eq!(cfg.spec(Stage::InteractionProfiling).name(), "plip");
        assert!(cfg.timeout().is_none());
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let cfg = ToolchainConfig { timeout_secs: Some(0), ..Default::default() };
        assert!(cfg.timeout().is_none());
        let cfg = ToolchainConfig { timeout_secs: Some(30), ..Default::default() };
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
    }
}
