// Run orchestration
//
// Four phases run strictly one after another: transfer (list, resolve,
// download, stage), load, purge and deduplicate. Inside a phase every unit
// runs concurrently up to its configured bound and the phase joins before the
// next one starts. Failures are logged and scoped to the smallest unit.

use anyhow::Result;
use chrono::{DateTime, Utc};
use datalake2bq_config::{PipelineConfig, RuntimeConfig};
use datalake2bq_core::{
    ExportPage, HttpClient, SchemaType, SchemaTypeSet, SignedTransfer, MAX_BATCH_SIZE,
};
use datalake2bq_source::{list_pages, SourceClient};
use datalake2bq_storage::{StagingReclaimer, TransferWorker};
use datalake2bq_warehouse::{DeduplicationJob, Warehouse, WarehouseLoader};
use futures::stream::{self, StreamExt};
use opendal::Operator;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Success/failure tally for one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    pub succeeded: usize,
    pub failed: usize,
}

impl PhaseCounts {
    fn record<T, E>(&mut self, result: &std::result::Result<T, E>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// What one run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub window_start: DateTime<Utc>,
    pub pages: usize,
    /// Exports listed across all pages
    pub listed: usize,
    /// Exports with a signed URL
    pub resolved: usize,
    pub transfers: PhaseCounts,
    /// Rows read from the footers of staged files
    pub staged_rows: i64,
    /// Schema types with at least one staged export, first-seen order
    pub schema_types: SchemaTypeSet,
    pub loads: PhaseCounts,
    pub purges: PhaseCounts,
    pub purged_objects: usize,
    pub dedups: PhaseCounts,
}

impl RunSummary {
    fn new(window_start: DateTime<Utc>) -> Self {
        Self {
            window_start,
            pages: 0,
            listed: 0,
            resolved: 0,
            transfers: PhaseCounts::default(),
            staged_rows: 0,
            schema_types: SchemaTypeSet::new(),
            loads: PhaseCounts::default(),
            purges: PhaseCounts::default(),
            purged_objects: 0,
            dedups: PhaseCounts::default(),
        }
    }
}

/// Result of transferring one metadata page
#[derive(Debug, Default)]
struct PageOutcome {
    listed: usize,
    resolved: usize,
    transfers: PhaseCounts,
    staged_rows: i64,
    schema_types: SchemaTypeSet,
}

/// Pair each signed transfer with the schema type its page listed for the same id
fn assign_schema_types(
    page: &ExportPage,
    signed: Vec<SignedTransfer>,
) -> Vec<(SignedTransfer, SchemaType)> {
    let index_by_id = page.schema_index();
    signed
        .into_iter()
        .map(|transfer| {
            let schema_type = match index_by_id.get(transfer.id.as_str()) {
                Some(schema_type) => (*schema_type).clone(),
                None => {
                    warn!(
                        export_id = %transfer.id,
                        "No descriptor for resolved export; staging as NOT_FOUND"
                    );
                    SchemaType::not_found()
                }
            };
            (transfer, schema_type)
        })
        .collect()
}

/// Listing window start for a run beginning at `now`
pub fn default_window_start(now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
    let lookback =
        chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::days(1));
    now - lookback
}

pub struct Pipeline {
    source: SourceClient,
    transfers: TransferWorker,
    reclaimer: StagingReclaimer,
    loader: WarehouseLoader,
    dedup: DeduplicationJob,
    settings: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        config: &RuntimeConfig,
        source: SourceClient,
        http: Arc<dyn HttpClient>,
        operator: Operator,
        warehouse: Arc<dyn Warehouse>,
    ) -> Self {
        let project = &config.warehouse.project_id;
        let dataset = &config.warehouse.dataset_id;
        Self {
            source,
            transfers: TransferWorker::new(http, operator.clone()),
            reclaimer: StagingReclaimer::new(operator),
            loader: WarehouseLoader::new(
                warehouse.clone(),
                project.as_str(),
                dataset.as_str(),
                config.storage.bucket.as_str(),
            ),
            dedup: DeduplicationJob::new(
                warehouse,
                project.as_str(),
                dataset.as_str(),
                config.pipeline.dedup_window_rows,
            ),
            settings: config.pipeline.clone(),
        }
    }

    /// Run all four phases once for exports created since `window_start`.
    ///
    /// Per-unit failures are logged and counted in the summary; they never
    /// fail the run.
    #[instrument(skip_all, fields(window_start = %window_start))]
    pub async fn run_once(&self, window_start: DateTime<Utc>) -> Result<RunSummary> {
        let mut summary = RunSummary::new(window_start);

        self.transfer_phase(window_start, &mut summary).await;
        let schema_types = summary.schema_types.clone();
        let loaded = self.load_phase(&schema_types, &mut summary).await;
        self.purge_phase(&loaded, &mut summary).await;
        self.dedup_phase(&schema_types, &mut summary).await;

        info!(
            pages = summary.pages,
            listed = summary.listed,
            transferred = summary.transfers.succeeded,
            transfer_failures = summary.transfers.failed,
            schema_types = summary.schema_types.len(),
            loads_failed = summary.loads.failed,
            purges_failed = summary.purges.failed,
            dedups_failed = summary.dedups.failed,
            "Run complete"
        );
        Ok(summary)
    }

    async fn transfer_phase(&self, window_start: DateTime<Utc>, summary: &mut RunSummary) {
        let started = Instant::now();
        info!(phase = "transfer", "Phase started");

        let mut outcomes: Vec<(usize, PageOutcome)> =
            list_pages(self.source.clone(), window_start)
                .enumerate()
                .map(|(index, page)| async move { (index, self.process_page(index, page).await) })
                .buffer_unordered(self.settings.page_concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|(index, _)| *index);

        for (_, outcome) in outcomes {
            summary.pages += 1;
            summary.listed += outcome.listed;
            summary.resolved += outcome.resolved;
            summary.transfers.succeeded += outcome.transfers.succeeded;
            summary.transfers.failed += outcome.transfers.failed;
            summary.staged_rows += outcome.staged_rows;
            summary.schema_types.merge(outcome.schema_types);
        }

        info!(
            phase = "transfer",
            pages = summary.pages,
            succeeded = summary.transfers.succeeded,
            failed = summary.transfers.failed,
            schema_types = ?summary.schema_types.as_slice(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Phase complete"
        );
    }

    /// Resolve and transfer every export of one page, then join
    #[instrument(skip_all, fields(page = index, exports = page.len()))]
    async fn process_page(&self, index: usize, page: ExportPage) -> PageOutcome {
        let mut outcome = PageOutcome {
            listed: page.len(),
            ..Default::default()
        };

        let ids = page.ids();
        let mut signed: Vec<SignedTransfer> = Vec::with_capacity(ids.len());
        for batch in ids.chunks(MAX_BATCH_SIZE) {
            match self.source.resolve(batch).await {
                Ok(resolved) => signed.extend(resolved),
                Err(e) => warn!(error = %e, "Bulk resolve rejected; skipping batch"),
            }
        }
        outcome.resolved = signed.len();

        let jobs = assign_schema_types(&page, signed);

        let mut results: Vec<_> = stream::iter(jobs.into_iter().enumerate())
            .map(|(position, (transfer, schema_type))| async move {
                let result = self.transfers.transfer(&transfer, &schema_type).await;
                (position, transfer.id, schema_type, result)
            })
            .buffer_unordered(self.settings.transfer_concurrency)
            .collect()
            .await;
        results.sort_by_key(|(position, ..)| *position);

        for (_, export_id, schema_type, result) in results {
            outcome.transfers.record(&result);
            match result {
                Ok(staged) => {
                    outcome.staged_rows += staged.row_count;
                    outcome.schema_types.insert(schema_type);
                }
                Err(e) => warn!(
                    export_id = %export_id,
                    schema_type = %schema_type,
                    code = %e.code(),
                    error = %e,
                    "Transfer failed; export dropped"
                ),
            }
        }

        outcome
    }

    /// Returns the schema types whose load succeeded
    async fn load_phase(
        &self,
        schema_types: &SchemaTypeSet,
        summary: &mut RunSummary,
    ) -> SchemaTypeSet {
        let started = Instant::now();
        info!(phase = "load", schema_types = schema_types.len(), "Phase started");

        let results: Vec<_> = stream::iter(schema_types.iter().cloned())
            .map(|schema_type| async move {
                let result = self.loader.load(&schema_type).await;
                (schema_type, result)
            })
            .buffer_unordered(self.settings.phase_concurrency)
            .collect()
            .await;

        let mut loaded = Vec::new();
        for (schema_type, result) in results {
            summary.loads.record(&result);
            match result {
                Ok(_) => loaded.push(schema_type),
                Err(e) => warn!(
                    schema_type = %schema_type,
                    code = %e.code(),
                    error = %e,
                    "Load failed; staged objects are kept"
                ),
            }
        }

        info!(
            phase = "load",
            succeeded = summary.loads.succeeded,
            failed = summary.loads.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Phase complete"
        );

        // Keep first-seen order for the purge phase
        schema_types
            .iter()
            .filter(|schema_type| loaded.contains(schema_type))
            .cloned()
            .collect()
    }

    async fn purge_phase(&self, loaded: &SchemaTypeSet, summary: &mut RunSummary) {
        let started = Instant::now();
        info!(phase = "purge", schema_types = loaded.len(), "Phase started");

        let results: Vec<_> = stream::iter(loaded.iter().cloned())
            .map(|schema_type| async move {
                let result = self.reclaimer.purge(&schema_type).await;
                (schema_type, result)
            })
            .buffer_unordered(self.settings.phase_concurrency)
            .collect()
            .await;

        for (schema_type, result) in results {
            summary.purges.record(&result);
            match result {
                Ok(deleted) => summary.purged_objects += deleted,
                Err(e) => warn!(
                    schema_type = %schema_type,
                    code = %e.code(),
                    error = %e,
                    "Purge failed; remaining objects stay staged"
                ),
            }
        }

        info!(
            phase = "purge",
            succeeded = summary.purges.succeeded,
            failed = summary.purges.failed,
            deleted = summary.purged_objects,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Phase complete"
        );
    }

    async fn dedup_phase(&self, schema_types: &SchemaTypeSet, summary: &mut RunSummary) {
        let started = Instant::now();
        let rules: Vec<_> = schema_types
            .iter()
            .filter_map(DeduplicationJob::rule_for)
            .collect();
        info!(phase = "dedup", tables = rules.len(), "Phase started");

        let results: Vec<_> = stream::iter(rules)
            .map(|rule| async move { (rule, self.dedup.run(rule).await) })
            .buffer_unordered(self.settings.phase_concurrency)
            .collect()
            .await;

        for (rule, result) in results {
            summary.dedups.record(&result);
            if let Err(e) = result {
                warn!(
                    schema_type = rule.schema_type,
                    code = %e.code(),
                    error = %e,
                    "Deduplication failed"
                );
            }
        }

        info!(
            phase = "dedup",
            succeeded = summary.dedups.succeeded,
            failed = summary.dedups.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Phase complete"
        );
    }
}
