//! The batch report: what was attempted, what succeeded, and why anything
//! failed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shade_model::{Diagnostic, ShaderStage};

use crate::artifact::{WrittenArtifacts, write_atomic};
use crate::driver::{Outcome, PipelineResult};
use crate::error::ArtifactError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded,
    Failed,
}

/// Report entry for one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub source: PathBuf,
    pub stage: ShaderStage,
    /// Profile label (`essl300`, `d3d11`).
    pub target: String,
    pub variant: String,
    pub status: ItemStatus,
    /// Terminal driver state.
    pub state: String,
    /// Written files. `None` for failures and dry runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<WrittenArtifacts>,
    pub mappings: usize,
    pub gaps: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Surface files the translation read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ItemReport {
    pub fn new(result: PipelineResult, artifacts: Option<WrittenArtifacts>) -> Self {
        let PipelineResult {
            item,
            state,
            outcome,
        } = result;
        let (status, mappings, gaps, diagnostics, dependencies) = match outcome {
            Outcome::Success(translation) => (
                ItemStatus::Succeeded,
                translation.map.mappings().len(),
                translation.gaps.len(),
                translation.diagnostics,
                translation.dependencies,
            ),
            Outcome::Failure { diagnostics } => {
                (ItemStatus::Failed, 0, 0, diagnostics, Vec::new())
            }
        };
        Self {
            source: item.source,
            stage: item.stage,
            target: item.profile.label(),
            variant: item.variant.suffix,
            status,
            state: state.to_string(),
            artifacts,
            mappings,
            gaps,
            diagnostics,
            dependencies,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Succeeded
    }

    /// `basic.vert [vertex] -> essl300-webgl2`
    pub fn label(&self) -> String {
        format!(
            "{} [{}] -> {}{}",
            self.source.display(),
            self.stage,
            self.target,
            self.variant
        )
    }
}

/// Aggregate of every work item of one batch, in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub gaps: usize,
    pub cancelled: bool,
    pub dry_run: bool,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new(items: Vec<ItemReport>, cancelled: bool, dry_run: bool) -> Self {
        let succeeded = items.iter().filter(|item| item.is_success()).count();
        Self {
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
            gaps: items.iter().map(|item| item.gaps).sum(),
            cancelled,
            dry_run,
            items,
        }
    }

    /// True when no item failed and the batch ran to completion.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    /// Every diagnostic, paired with the item it belongs to.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&ItemReport, &Diagnostic)> {
        self.items
            .iter()
            .flat_map(|item| item.diagnostics.iter().map(move |diagnostic| (item, diagnostic)))
    }

    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        write_atomic(path, self.to_json()?.as_bytes())?;
        Ok(())
    }
}
