//! TL-011: Project configuration (`tasklingo.yaml`).

use super::types::{AmbiguityPolicy, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "tasklingo.yaml";

/// Run settings. Every field is optional; CLI flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Container registry CSV.
    #[serde(default)]
    pub registry: Option<PathBuf>,

    /// Output document path. Stdout when absent.
    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,
}

impl ProjectConfig {
    /// Resolve relative paths against the directory holding the config file.
    pub fn rebase(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.registry = self.registry.map(join);
        self.output = self.output.map(join);
        self
    }
}

/// Parse a tasklingo.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<ProjectConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let config = parse_config(&content)?;
    Ok(match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => config.rebase(dir),
        _ => config,
    })
}

/// Parse a tasklingo.yaml from a string. An empty document is the default config.
pub fn parse_config(yaml: &str) -> Result<ProjectConfig, String> {
    if yaml.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Load `path` if given, else `tasklingo.yaml` in the working directory when present.
pub fn load_config(path: Option<&Path>) -> Result<ProjectConfig, String> {
    match path {
        Some(p) => parse_config_file(p),
        None => {
            let default = Path::new(CONFIG_FILE);
            if default.exists() {
                parse_config_file(default)
            } else {
                Ok(ProjectConfig::default())
            }
        }
    }
}

/// Template written by `tasklingo init`.
pub const CONFIG_TEMPLATE: &str = "\
# tasklingo project configuration
registry: container_assets.csv   # container registry CSV
# output: poses.yaml             # output document (stdout when absent)
format: yaml                     # yaml | json
ambiguity: first_match           # first_match | unresolved
";

/// Example registry written by `tasklingo init`.
pub const REGISTRY_TEMPLATE: &str = "\
id,aruco_id,position,orientation,type,size,content_name,content_volume,content_color,active_status,landmark
beaker_1,11,\"[0.5, 0.1, 0.2]\",\"[0, 0, 0, 1]\",beaker,250ml,copper sulphate solution,50,blue,False,shelf
beaker_2,12,\"[0.6, -0.1, 0.2]\",\"[0, 0, 0, 1]\",beaker,250ml,distilled water,100,clear,False,shelf
flask_1,13,\"[0.3, 0.3, 0.1]\",\"[0, 0, 0, 1]\",flask,500ml,null,null,null,True,bench
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tl011_parse_full() {
        let cfg = parse_config(
            "registry: reg.csv\noutput: out.json\nformat: json\nambiguity: unresolved\n",
        )
        .unwrap();
        assert_eq!(cfg.registry, Some(PathBuf::from("reg.csv")));
        assert_eq!(cfg.output, Some(PathBuf::from("out.json")));
        assert_eq!(cfg.format, OutputFormat::Json);
        assert_eq!(cfg.ambiguity, AmbiguityPolicy::Unresolved);
    }

    #[test]
    fn test_tl011_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, ProjectConfig::default());
        assert_eq!(cfg.format, OutputFormat::Yaml);
        assert_eq!(cfg.ambiguity, AmbiguityPolicy::FirstMatch);
    }

    #[test]
    fn test_tl011_rejects_unknown_values() {
        assert!(parse_config("format: toml\n").is_err());
        assert!(parse_config("registy: typo.csv\n").is_err());
    }

    #[test]
    fn test_tl011_template_parses() {
        let cfg = parse_config(CONFIG_TEMPLATE).unwrap();
        assert_eq!(cfg.registry, Some(PathBuf::from("container_assets.csv")));
        assert!(cfg.output.is_none());
    }

    #[test]
    fn test_tl011_file_paths_rebased() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "registry: reg.csv\noutput: /abs/out.yaml\n").unwrap();
        let cfg = parse_config_file(&path).unwrap();
        assert_eq!(cfg.registry, Some(dir.path().join("reg.csv")));
        assert_eq!(cfg.output, Some(PathBuf::from("/abs/out.yaml")));
    }

    #[test]
    fn test_tl011_missing_file() {
        let err = parse_config_file(Path::new("/nonexistent/tasklingo.yaml")).unwrap_err();
        assert!(err.contains("failed to read"));
    }

    #[test]
    fn test_tl011_registry_template_loads() {
        let reg = crate::core::registry::Registry::from_reader(REGISTRY_TEMPLATE.as_bytes()).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.get("active_container").unwrap().id, "flask_1");
    }
}
