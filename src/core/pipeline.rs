//! TL-012: End-to-end run from instruction text to pose document.
//!
//! Stages run strictly in order: parse, resolve, normalize, synthesize.
//! Each stage's diagnostics are appended to the report; nothing short of a
//! registry load failure (handled by the caller) aborts a run.

use super::error::Diagnostic;
use super::normalizer::normalize_all;
use super::parser::parse_instruction;
use super::registry::Registry;
use super::resolver::resolve_commands;
use super::synthesizer::synthesize;
use super::types::{AmbiguityPolicy, Command, OutputFormat, PoseDocument, ResolvedCommand};
use std::path::Path;
use tracing::info;

/// Everything a run produced, stage by stage.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub commands: Vec<Command>,
    pub resolved: Vec<ResolvedCommand>,
    pub opcodes: Vec<String>,
    pub relevant_ids: Vec<String>,
    pub document: PoseDocument,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse, resolve and normalize an instruction into op-code lines.
pub fn translate(text: &str, registry: &Registry, policy: AmbiguityPolicy) -> RunReport {
    let parsed = parse_instruction(text);
    let batch = resolve_commands(&parsed.commands, registry, policy);
    let opcodes = normalize_all(&batch.commands);

    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(batch.diagnostics);
    RunReport {
        commands: parsed.commands,
        resolved: batch.commands,
        opcodes,
        relevant_ids: batch.relevant_ids,
        document: PoseDocument::default(),
        diagnostics,
    }
}

/// Full pipeline. The registry is read-only; synthesis works on a snapshot.
pub fn run(text: &str, registry: &Registry, policy: AmbiguityPolicy) -> RunReport {
    let mut report = translate(text, registry, policy);
    let synthesis = synthesize(report.opcodes.iter().map(String::as_str), registry);
    report.document = synthesis.document;
    report.diagnostics.extend(synthesis.diagnostics);
    info!(
        commands = report.commands.len(),
        poses = report.document.poses.len(),
        diagnostics = report.diagnostics.len(),
        "run complete"
    );
    report
}

/// Serialize a pose document.
pub fn render_document(document: &PoseDocument, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml_ng::to_string(document).map_err(|e| format!("serialize error: {}", e))
        }
        OutputFormat::Json => serde_json::to_string_pretty(document)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| format!("serialize error: {}", e)),
    }
}

/// Write a rendered document atomically (temp file, then rename).
pub fn write_document(path: &Path, rendered: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create dir {}: {}", parent.display(), e))?;
    }
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);
    std::fs::write(tmp_path, rendered)
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    std::fs::rename(tmp_path, path)
        .map_err(|e| format!("cannot rename {} → {}: {}", tmp_path.display(), path.display(), e))
}

/// Content digest of a rendered document.
pub fn document_digest(rendered: &str) -> String {
    format!("blake3:{}", blake3::hash(rendered.as_bytes()).to_hex())
}
