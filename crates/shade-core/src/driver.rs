//! Pipeline driver: front end, back end, then map composition, for one
//! work item.
//!
//! The driver walks a small state machine:
//!
//! ```text
//! Pending -> FrontEndRunning -> FrontEndFailed
//!                            -> BackEndRunning -> BackEndFailed
//!                                              -> Composing -> Done
//! ```
//!
//! Adapter errors end the walk in the matching failed state and become a
//! [`Outcome::Failure`]; they never escape the driver. A raised cancel
//! token moves any non-terminal state to `Cancelled`.
//!
//! Intermediate profiles (`spirv`) skip the back end: the encoded IR module
//! is the output and the front end's map is the artifact map.

use std::fmt;
use std::time::Instant;

use shade_back::{BackEnd, BackEndOptions, BackEndRequest};
use shade_front::{FileIncluder, FrontEnd, FrontEndRequest};
use shade_ir::IR_SOURCE_NAME;
use shade_map::{SourceMap, compose};
use shade_model::{
    Define, Diagnostic, DiagnosticOrigin, Granularity, SourcePosition, WorkItem,
};
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;

/// Where a driver is in its walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    Pending,
    FrontEndRunning,
    FrontEndFailed,
    BackEndRunning,
    BackEndFailed,
    Composing,
    Done,
    Cancelled,
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::FrontEndFailed | Self::BackEndFailed | Self::Done | Self::Cancelled
        )
    }

    fn can_advance_to(self, next: DriverState) -> bool {
        if next == Self::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Self::Pending, Self::FrontEndRunning)
                | (
                    Self::FrontEndRunning,
                    Self::FrontEndFailed | Self::BackEndRunning
                )
                | (Self::BackEndRunning, Self::BackEndFailed | Self::Composing)
                | (Self::Composing, Self::Done)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::FrontEndRunning => "front_end_running",
            Self::FrontEndFailed => "front_end_failed",
            Self::BackEndRunning => "back_end_running",
            Self::BackEndFailed => "back_end_failed",
            Self::Composing => "composing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful translation.
#[derive(Debug, Clone)]
pub struct Translation {
    /// Target text, or the encoded IR module for intermediate profiles.
    pub output: Vec<u8>,
    /// Generated output -> surface sources.
    pub map: SourceMap,
    /// Generated positions left unmapped by composition.
    pub gaps: Vec<SourcePosition>,
    /// Warnings from both adapters, in surface terms where possible.
    pub diagnostics: Vec<Diagnostic>,
    /// Surface files the translation read: the source, then its includes.
    pub dependencies: Vec<String>,
}

impl Translation {
    /// The output as text. `None` for binary output.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.output).ok()
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Translation),
    Failure { diagnostics: Vec<Diagnostic> },
}

/// The result of driving one work item.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub item: WorkItem,
    /// Terminal state the driver stopped in.
    pub state: DriverState,
    pub outcome: Outcome,
}

impl PipelineResult {
    /// A failure for an item that never ran or was abandoned.
    pub fn failed(item: WorkItem, state: DriverState, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            item,
            state,
            outcome: Outcome::Failure { diagnostics },
        }
    }

    pub fn cancelled(item: WorkItem) -> Self {
        let diagnostic = Diagnostic::error(DiagnosticOrigin::Batch, "cancelled");
        Self::failed(item, DriverState::Cancelled, vec![diagnostic])
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn translation(&self) -> Option<&Translation> {
        match &self.outcome {
            Outcome::Success(translation) => Some(translation),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match &self.outcome {
            Outcome::Success(translation) => &translation.diagnostics,
            Outcome::Failure { diagnostics } => diagnostics,
        }
    }
}

/// Settings shared by every work item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Defines added after the profile's own defines.
    pub defines: Vec<Define>,
    /// Entry point of HLSL sources.
    pub entry_point: String,
    pub granularity: Granularity,
    pub back_end: BackEndOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            defines: Vec::new(),
            entry_point: "main".to_string(),
            granularity: Granularity::Token,
            back_end: BackEndOptions::default(),
        }
    }
}

/// Drives one work item through both adapters. Create one per item.
pub struct PipelineDriver<'a> {
    front: &'a dyn FrontEnd,
    back: &'a dyn BackEnd,
    options: &'a PipelineOptions,
    cancel: Option<&'a CancelToken>,
    state: DriverState,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(front: &'a dyn FrontEnd, back: &'a dyn BackEnd, options: &'a PipelineOptions) -> Self {
        Self {
            front,
            back,
            options,
            cancel: None,
            state: DriverState::Pending,
        }
    }

    /// Abandons the item between adapter calls once `cancel` is raised.
    #[must_use]
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn advance(&mut self, next: DriverState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid driver transition {} -> {}",
            self.state,
            next
        );
        trace!(from = %self.state, to = %next, "driver transition");
        self.state = next;
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    fn abandon(&mut self, item: WorkItem) -> PipelineResult {
        self.advance(DriverState::Cancelled);
        debug!(item = %item, "cancelled");
        PipelineResult::cancelled(item)
    }

    /// Reads the item's source file and translates it.
    pub fn run(mut self, item: WorkItem) -> PipelineResult {
        match std::fs::read_to_string(&item.source) {
            Ok(source) => self.translate(item, &source),
            Err(err) => {
                let diagnostic = Diagnostic::error(
                    DiagnosticOrigin::Io,
                    format!("failed to read {}: {err}", item.source.display()),
                );
                self.advance(DriverState::FrontEndRunning);
                self.advance(DriverState::FrontEndFailed);
                PipelineResult::failed(item, self.state, vec![diagnostic])
            }
        }
    }

    /// Translates `source` as the text of `item.source`.
    pub fn translate(mut self, item: WorkItem, source: &str) -> PipelineResult {
        let started = Instant::now();
        let source_name = item.source.to_string_lossy().into_owned();
        if self.is_cancelled() {
            return self.abandon(item);
        }

        self.advance(DriverState::FrontEndRunning);
        let mut defines = item.profile.defines();
        defines.extend(self.options.defines.iter().cloned());
        defines.extend(item.variant.defines.iter().cloned());
        let includer = FileIncluder::new();
        let request = FrontEndRequest::new(item.stage, &source_name, source)
            .language(item.language)
            .entry_point(&self.options.entry_point)
            .defines(&defines)
            .granularity(self.options.granularity)
            .includer(&includer);
        let front = match self.front.compile(&request) {
            Ok(front) => front,
            Err(err) => {
                self.advance(DriverState::FrontEndFailed);
                debug!(front_end = self.front.name(), %err, "front end failed");
                return PipelineResult::failed(item, self.state, err.diagnostics);
            }
        };
        if self.is_cancelled() {
            return self.abandon(item);
        }

        self.advance(DriverState::BackEndRunning);
        if item.profile.kind.is_intermediate() {
            self.advance(DriverState::Composing);
            self.advance(DriverState::Done);
            debug!(
                item = %item,
                bytes = front.ir.len(),
                duration_ms = started.elapsed().as_millis() as u64,
                "wrote intermediate module"
            );
            let dependencies = front.map.sources().to_vec();
            return PipelineResult {
                item,
                state: self.state,
                outcome: Outcome::Success(Translation {
                    output: front.ir,
                    map: front.map,
                    gaps: Vec::new(),
                    diagnostics: front.diagnostics,
                    dependencies,
                }),
            };
        }
        let output_name = item.output_file_name();
        let stem = item.source_stem();
        let request = BackEndRequest::new(&front.ir, item.profile, &output_name)
            .options(self.options.back_end)
            .source_stem(&stem);
        let back = match self.back.compile(&request) {
            Ok(back) => back,
            Err(err) => {
                self.advance(DriverState::BackEndFailed);
                debug!(back_end = self.back.name(), %err, "back end failed");
                let mut diagnostics = front.diagnostics;
                diagnostics.extend(remap_diagnostics(err.diagnostics, &front.map));
                return PipelineResult::failed(item, self.state, diagnostics);
            }
        };
        if self.is_cancelled() {
            return self.abandon(item);
        }

        self.advance(DriverState::Composing);
        let composition = compose(&front.map, &back.map);
        if composition.gap_count() > 0 {
            warn!(
                item = %item,
                gaps = composition.gap_count(),
                "composed map leaves generated positions unmapped"
            );
        }
        let mut diagnostics = front.diagnostics;
        diagnostics.extend(remap_diagnostics(back.diagnostics, &front.map));
        self.advance(DriverState::Done);

        debug!(
            item = %item,
            lines = back.text.lines().count(),
            mappings = composition.map.mappings().len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "translated"
        );
        PipelineResult {
            item,
            state: self.state,
            outcome: Outcome::Success(Translation {
                output: back.text.into_bytes(),
                map: composition.map,
                gaps: composition.gaps,
                diagnostics,
                dependencies: front.map.sources().to_vec(),
            }),
        }
    }
}

/// Re-expresses diagnostics located in the IR in terms of the surface
/// sources. Diagnostics the map cannot place keep their IR location.
pub fn remap_diagnostics(diagnostics: Vec<Diagnostic>, front_map: &SourceMap) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .map(|mut diagnostic| {
            if let Some(location) = &diagnostic.location
                && location.file == IR_SOURCE_NAME
                && let Some(surface) = front_map.resolve(location.line, location.column)
            {
                diagnostic.location = Some(surface);
            }
            diagnostic
        })
        .collect()
}
