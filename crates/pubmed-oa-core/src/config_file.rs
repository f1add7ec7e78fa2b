use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub discovery: Option<DiscoveryConfig>,
    pub batch: Option<BatchConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// File extensions (without the dot) treated as articles.
    pub extensions: Option<Vec<String>>,
    pub include_hidden: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// `"skip"` or `"abort"`.
    pub on_error: Option<String>,
    pub include_path: Option<bool>,
    pub remove_empty_abstract: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// `"json"`, `"csv"` or `"markdown"`.
    pub format: Option<String>,
    pub color: Option<bool>,
}

/// Platform config directory path: `<config_dir>/pubmed-oa/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pubmed-oa").join("config.toml"))
}

/// Load config by cascading CWD `.pubmed-oa.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pubmed-oa.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bd, od) = (base.discovery.unwrap_or_default(), overlay.discovery.unwrap_or_default());
    let (bb, ob) = (base.batch.unwrap_or_default(), overlay.batch.unwrap_or_default());
    let (bo, oo) = (base.output.unwrap_or_default(), overlay.output.unwrap_or_default());

    ConfigFile {
        discovery: Some(DiscoveryConfig {
            extensions: od.extensions.or(bd.extensions),
            include_hidden: od.include_hidden.or(bd.include_hidden),
        }),
        batch: Some(BatchConfig {
            on_error: ob.on_error.or(bb.on_error),
            include_path: ob.include_path.or(bb.include_path),
            remove_empty_abstract: ob.remove_empty_abstract.or(bb.remove_empty_abstract),
        }),
        output: Some(OutputConfig {
            format: oo.format.or(bo.format),
            color: oo.color.or(bo.color),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let toml_str = "[batch]\non_error = \"abort\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.batch.unwrap().on_error.as_deref(), Some("abort"));
        assert!(parsed.discovery.is_none());
        assert!(parsed.output.is_none());
    }

    #[test]
    fn extensions_round_trip_toml() {
        let config = ConfigFile {
            discovery: Some(DiscoveryConfig {
                extensions: Some(vec!["nxml".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            output: Some(OutputConfig {
                format: Some("json".to_string()),
                color: Some(true),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            output: Some(OutputConfig {
                format: Some("csv".to_string()),
                color: None,
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay).output.unwrap();
        assert_eq!(merged.format.as_deref(), Some("csv"));
        assert_eq!(merged.color, Some(true));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            batch: Some(BatchConfig {
                remove_empty_abstract: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.batch.unwrap().remove_empty_abstract, Some(true));
    }

    #[test]
    fn load_from_path_reads_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[discovery]\ninclude_hidden = true\n").unwrap();
        let loaded = load_from_path(&good).unwrap();
        assert_eq!(loaded.discovery.unwrap().include_hidden, Some(true));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[discovery\n").unwrap();
        assert!(load_from_path(&bad).is_none());
        assert!(load_from_path(&dir.path().join("missing.toml")).is_none());
    }
}
