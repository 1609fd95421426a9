//! Pipeline definitions - the built-in Go pipeline and YAML-defined pipelines

use crate::core::{Error, Pipeline, Step, StepConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Pipeline file picked up from the project directory when no config is given
pub const PROJECT_CONFIG_FILE: &str = "goci.yml";

/// Settings for the built-in Go pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoOptions {
    pub remote: String,
    pub branch: String,
    pub push_timeout: Duration,
}

impl Default for GoOptions {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            branch: "main".to_string(),
            push_timeout: Duration::from_secs(10),
        }
    }
}

/// Build, test, format check and push for a Go project.
///
/// `go build . errors` builds more than one package, so go build writes no binary.
pub fn go_pipeline(proj: &Path, opts: &GoOptions) -> Result<Pipeline, Error> {
    let args = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let steps = vec![
        Step::plain(StepConfig::new(
            "go build",
            "go",
            "Go build: SUCCESS",
            proj,
            args(&["build", ".", "errors"]),
        )),
        Step::plain(StepConfig::new(
            "go test",
            "go",
            "Go test: SUCCESS",
            proj,
            args(&["test", "-v"]),
        )),
        Step::output_sensitive(StepConfig::new(
            "go fmt",
            "gofmt",
            "gofmt: SUCCESS",
            proj,
            args(&["-l", "."]),
        )),
        Step::timeout(
            StepConfig::new(
                "git push",
                "git",
                "git push: SUCCESS",
                proj,
                vec!["push".to_string(), opts.remote.clone(), opts.branch.clone()],
            ),
            opts.push_timeout,
        ),
    ];

    Pipeline::new(steps)
}

/// How a configured step decides success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    #[default]
    Plain,
    OutputSensitive,
    Timeout,
}

/// One step as written in a pipeline file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub exe: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Defaults to "<name>: SUCCESS"
    pub message: Option<String>,
    #[serde(default)]
    pub kind: StepKind,
    /// Only used by timeout steps; 0 or unset means the default
    pub timeout_secs: Option<u64>,
}

/// Pipeline file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

impl PipelineConfig {
    /// Load pipeline config from YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config {}", path.display()))?;
        let config: PipelineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid pipeline config {}", path.display()))?;
        Ok(config)
    }

    /// Load `goci.yml` from the project directory, if present
    pub fn from_project(proj: &Path) -> Result<Option<Self>> {
        let path = proj.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::from_file(&path).map(Some)
    }

    /// Build the pipeline with every step running in `proj`
    pub fn into_pipeline(self, proj: &Path) -> Result<Pipeline> {
        let steps = self
            .steps
            .into_iter()
            .map(|spec| {
                if spec.timeout_secs.is_some() && spec.kind != StepKind::Timeout {
                    log::warn!("Step {} sets timeout_secs but is not a timeout step", spec.name);
                }

                let message = spec
                    .message
                    .unwrap_or_else(|| format!("{}: SUCCESS", spec.name));
                let config = StepConfig::new(spec.name, spec.exe, message, proj, spec.args);

                match spec.kind {
                    StepKind::Plain => Step::plain(config),
                    StepKind::OutputSensitive => Step::output_sensitive(config),
                    StepKind::Timeout => Step::timeout(
                        config,
                        Duration::from_secs(spec.timeout_secs.unwrap_or(0)),
                    ),
                }
            })
            .collect();

        Ok(Pipeline::new(steps)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEFAULT_TIMEOUT;

    #[test]
    fn test_go_pipeline_order() {
        let pipeline = go_pipeline(Path::new("./proj"), &GoOptions::default()).unwrap();
        let names: Vec<_> = pipeline.steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["go build", "go test", "go fmt", "git push"]);

        assert!(matches!(pipeline.steps()[2], Step::OutputSensitive(_)));
        match &pipeline.steps()[3] {
            Step::Timeout(step) => {
                assert_eq!(step.timeout(), Duration::from_secs(10));
                assert_eq!(step.config.args, vec!["push", "origin", "main"]);
            }
            other => panic!("expected timeout step, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_pipeline_config() {
        let yaml = r#"
steps:
  - name: Build
    exe: cargo
    args: [build]
    message: "Build: SUCCESS"
  - name: Fmt
    exe: cargo
    args: [fmt, --check]
    kind: output-sensitive
  - name: Publish
    exe: git
    args: [push]
    kind: timeout
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.steps.len(), 3);
        assert_eq!(config.steps[0].kind, StepKind::Plain);
        assert_eq!(config.steps[1].kind, StepKind::OutputSensitive);

        let pipeline = config.into_pipeline(Path::new(".")).unwrap();
        assert_eq!(pipeline.steps()[1].config().message, "Fmt: SUCCESS");
        match &pipeline.steps()[2] {
            Step::Timeout(step) => assert_eq!(step.timeout(), DEFAULT_TIMEOUT),
            other => panic!("expected timeout step, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_config_rejected() {
        let config: PipelineConfig = serde_yaml::from_str("steps: []").unwrap();
        assert!(config.into_pipeline(Path::new(".")).is_err());
    }

    #[test]
    fn test_from_project_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PipelineConfig::from_project(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "steps: [unclosed").unwrap();

        let err = PipelineConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("goci.yml"));
    }
}
