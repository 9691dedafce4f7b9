#[cfg(test)]
mod tests {
    use super::super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_match_bundled_layout() {
        let config = Config::default();
        assert_eq!(config.storage.results_dir, PathBuf::from("results"));
        assert_eq!(config.storage.layout.default_antibody_dir, PathBuf::from("antibodies/default"));
        assert_eq!(config.tools.docking.program, PathBuf::from("./hdock"));
        assert_eq!(config.tools.affinity.args, vec!["{complex}"]);
        assert!(config.tools.timeout().is_none());
        assert!(config.delivery.outbox_dir.is_none());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.storage.layout.extension, "pdb");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duodok.toml");
        std::fs::write(
            &path,
            r#"
[storage]
results_dir = "/srv/duodok/results"
receptor_dir = "/srv/duodok/receptors"

[tools]
timeout_secs = 600

[tools.affinity]
program = "/opt/prodigy/bin/prodigy"
args = ["{complex}", "--quiet"]

[delivery]
outbox_dir = "outbox"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage.results_dir, PathBuf::from("/srv/duodok/results"));
        assert_eq!(config.storage.layout.receptor_dir, PathBuf::from("/srv/duodok/receptors"));
        assert_eq!(config.storage.layout.antibody_dir, PathBuf::from("antibodies"));
        assert_eq!(config.tools.timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.tools.affinity.args, vec!["{complex}", "--quiet"]);
        assert_eq!(config.tools.profiling.program, PathBuf::from("plip"));
        assert_eq!(config.delivery.outbox_dir, Some(PathBuf::from("outbox")));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duodok.toml");
        std::fs::write(&path, "[tools\ntimeout_secs = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
