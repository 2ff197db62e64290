//! Batch orchestration: plan the work items, run them on a worker pool,
//! write the artifacts of every success and report on all of them.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use shade_back::BackEnd;
use shade_front::FrontEnd;
use shade_model::{Diagnostic, DiagnosticOrigin, WorkItem};
use tracing::{Span, error, info, info_span, warn};

use crate::artifact::{ArtifactOptions, write_translation};
use crate::cancel::CancelToken;
use crate::config::BatchConfig;
use crate::discovery::discover_sources;
use crate::driver::{DriverState, PipelineDriver, PipelineOptions, PipelineResult};
use crate::error::DiscoveryError;
use crate::plan::{artifact_name_clashes, plan_work_items};
use crate::report::{BatchReport, ItemReport};

/// Runs every work item of a configuration.
///
/// Items are independent: one failing (or panicking) never stops the
/// others, and every success gets its artifacts even when siblings fail.
/// Items whose artifact names collide fail without running. Results are
/// reported in work-item order regardless of completion order.
pub struct BatchOrchestrator<'a> {
    front: &'a dyn FrontEnd,
    back: &'a dyn BackEnd,
    config: &'a BatchConfig,
    cancel: CancelToken,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(front: &'a dyn FrontEnd, back: &'a dyn BackEnd, config: &'a BatchConfig) -> Self {
        Self {
            front,
            back,
            config,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Discovers the configured sources and enumerates their work items.
    pub fn plan(&self) -> Result<Vec<WorkItem>, DiscoveryError> {
        let sources = discover_sources(&self.config.sources)?;
        Ok(plan_work_items(&sources, self.config))
    }

    pub fn run(&self) -> Result<BatchReport, DiscoveryError> {
        let items = self.plan()?;
        Ok(self.run_items(items))
    }

    /// Runs `items` on up to `config.concurrency()` worker threads.
    pub fn run_items(&self, items: Vec<WorkItem>) -> BatchReport {
        let started = Instant::now();
        let jobs = self.config.concurrency().min(items.len()).max(1);
        let span = info_span!("batch", items = items.len(), jobs);
        let _guard = span.enter();
        info!(dry_run = self.config.dry_run, "starting batch");

        let options = self.config.pipeline_options();
        let clashes = artifact_name_clashes(&items);
        let next = AtomicUsize::new(0);
        let mut slots: Vec<Option<ItemReport>> = vec![None; items.len()];

        std::thread::scope(|scope| {
            let workers: Vec<_> = (0..jobs)
                .map(|_| scope.spawn(|| self.worker(&items, &clashes, &next, &options, &span)))
                .collect();
            for worker in workers {
                match worker.join() {
                    Ok(done) => {
                        for (index, report) in done {
                            slots[index] = Some(report);
                        }
                    }
                    Err(_) => error!("batch worker panicked"),
                }
            }
        });

        let reports: Vec<ItemReport> = items
            .into_iter()
            .zip(slots)
            .map(|(item, slot)| {
                slot.unwrap_or_else(|| {
                    let diagnostic =
                        Diagnostic::error(DiagnosticOrigin::Batch, "worker stopped unexpectedly");
                    ItemReport::new(
                        PipelineResult::failed(item, DriverState::Pending, vec![diagnostic]),
                        None,
                    )
                })
            })
            .collect();

        let report = BatchReport::new(reports, self.cancel.is_cancelled(), self.config.dry_run);
        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            gaps = report.gaps,
            cancelled = report.cancelled,
            duration_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        report
    }

    fn worker(
        &self,
        items: &[WorkItem],
        clashes: &BTreeMap<usize, Vec<String>>,
        next: &AtomicUsize,
        options: &PipelineOptions,
        batch: &Span,
    ) -> Vec<(usize, ItemReport)> {
        let mut done = Vec::new();
        loop {
            let index = next.fetch_add(1, Ordering::SeqCst);
            let Some(item) = items.get(index) else {
                break;
            };
            if let Some(others) = clashes.get(&index) {
                done.push((index, clash_failure(item.clone(), others)));
                continue;
            }
            let report = catch_unwind(AssertUnwindSafe(|| {
                self.process(item.clone(), options, batch)
            }))
            .unwrap_or_else(|payload| {
                let message = format!("work item panicked: {}", panic_message(payload.as_ref()));
                error!(item = %item, error = %message, "work item panicked");
                let diagnostic = Diagnostic::error(DiagnosticOrigin::Batch, message);
                ItemReport::new(
                    PipelineResult::failed(item.clone(), DriverState::Pending, vec![diagnostic]),
                    None,
                )
            });
            done.push((index, report));
        }
        done
    }

    fn process(&self, item: WorkItem, options: &PipelineOptions, batch: &Span) -> ItemReport {
        let span = info_span!(
            parent: batch,
            "work_item",
            source = %item.source.display(),
            stage = %item.stage,
            target = %item.profile.label(),
            variant = %item.variant.suffix,
        );
        let _guard = span.enter();

        if self.cancel.is_cancelled() {
            return ItemReport::new(PipelineResult::cancelled(item), None);
        }

        let result = PipelineDriver::new(self.front, self.back, options)
            .with_cancel(&self.cancel)
            .run(item);
        let Some(translation) = result.translation() else {
            for diagnostic in result.diagnostics() {
                warn!(%diagnostic, "work item failed");
            }
            return ItemReport::new(result, None);
        };

        if self.config.dry_run {
            return ItemReport::new(result, None);
        }
        if self.cancel.is_cancelled() {
            return ItemReport::new(PipelineResult::cancelled(result.item), None);
        }

        let artifact_options = ArtifactOptions {
            embed_sources: self.config.embed_sources,
            dependency_options: self
                .config
                .deps
                .then(|| self.config.dependency_options(&result.item.profile)),
        };
        match write_translation(
            &self.config.output_dir,
            &result.item,
            translation,
            &artifact_options,
        ) {
            Ok(artifacts) => {
                info!(output = %artifacts.output.path.display(), "wrote artifacts");
                ItemReport::new(result, Some(artifacts))
            }
            Err(err) => {
                let message = error_chain(&err);
                error!(error = %message, "failed to write artifacts");
                let diagnostic = Diagnostic::error(DiagnosticOrigin::Io, message);
                ItemReport::new(
                    PipelineResult::failed(result.item, result.state, vec![diagnostic]),
                    None,
                )
            }
        }
    }
}

fn clash_failure(item: WorkItem, others: &[String]) -> ItemReport {
    let message = format!(
        "artifact name {} is also produced by {}",
        item.output_file_name(),
        others.join(", ")
    );
    warn!(item = %item, "{message}");
    let diagnostic = Diagnostic::error(DiagnosticOrigin::Batch, message);
    ItemReport::new(
        PipelineResult::failed(item, DriverState::Pending, vec![diagnostic]),
        None,
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
