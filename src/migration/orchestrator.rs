//! Stage sequencing and the top-level migration entry points

use super::batch::{BatchReader, DEFAULT_BATCH_SIZE};
use super::config::MigrationConfig;
use super::mapper::{map_row, MappingError};
use super::projection::{BatchCounts, ProjectionBuilder};
use super::report::{MigrationReport, StageReport, StageStatus};
use super::schema::Stage;
use super::{MigrationError, MigrationResult};
use crate::graph::{GraphStore, GraphTarget};
use crate::linker::{link_catalog, LinkReport};
use crate::relational::{CatalogStore, RelationalSource, Row};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs stages against one source and one target.
///
/// Stages always execute in canonical order, node stages before edge
/// stages, whatever order they were selected in. A row that fails to map or
/// merge is skipped and counted; a batch that cannot be fetched ends its
/// stage, and the run moves on to the next one.
pub struct Migrator<S, T> {
    source: S,
    builder: ProjectionBuilder<T>,
    batch_size: usize,
    stages: Vec<Stage>,
}

impl<S: RelationalSource, T: GraphTarget> Migrator<S, T> {
    pub fn new(source: S, target: T) -> Self {
        Self {
            source,
            builder: ProjectionBuilder::new(target),
            batch_size: DEFAULT_BATCH_SIZE,
            stages: Stage::ALL.to_vec(),
        }
    }

    pub fn from_config(source: S, target: T, config: &MigrationConfig) -> Self {
        Self::new(source, target)
            .with_batch_size(config.batch_size)
            .with_stages(&config.stages)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_stages(mut self, stages: &[Stage]) -> Self {
        self.stages = Stage::canonical(stages);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn target(&self) -> &T {
        self.builder.target()
    }

    pub fn into_target(self) -> T {
        self.builder.into_target()
    }

    /// Attempt every selected stage once
    pub fn run(&mut self) -> MigrationReport {
        let mut report = MigrationReport::new(self.batch_size);
        info!(
            run_id = %report.run_id,
            stages = self.stages.len(),
            batch_size = self.batch_size,
            "migration started"
        );

        for stage in self.stages.clone() {
            let stage_report = self.run_stage(stage);
            report.add_stage(stage_report);
        }

        report.finish();
        let totals = report.totals();
        info!(
            run_id = %report.run_id,
            status = %report.status,
            succeeded = totals.succeeded,
            failed = totals.failed,
            missing_endpoints = totals.missing_endpoints,
            "migration finished"
        );
        report
    }

    /// Read, map and merge every row of one stage
    pub fn run_stage(&mut self, stage: Stage) -> StageReport {
        let started = Instant::now();
        let projection = stage.projection();
        let mut report = StageReport::new(stage);

        let reader = BatchReader::new(
            &self.source,
            projection.query(),
            self.batch_size,
            |row: &Row| map_row(projection, row).map_err(|e| (row.cursor, e)),
        );

        for batch in reader {
            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(stage = %stage, error = %e, "batch fetch failed, abandoning stage");
                    report.status = StageStatus::Failed;
                    report.error = Some(e.to_string());
                    break;
                }
            };
            report.batches += 1;

            let mut records = Vec::with_capacity(batch.len());
            let mut unmapped = 0;
            for mapped in batch {
                match mapped {
                    Ok(record) => records.push(record),
                    Err((cursor, e)) => {
                        log_unmapped(stage, cursor, &e);
                        unmapped += 1;
                    }
                }
            }

            let mut counts = self.builder.apply(records);
            counts += BatchCounts {
                attempted: unmapped,
                failed: unmapped,
                ..Default::default()
            };
            report.mapping_failures += unmapped;
            debug!(
                stage = %stage,
                batch = report.batches,
                attempted = counts.attempted,
                succeeded = counts.succeeded,
                "batch merged"
            );
            report.counts += counts;
        }

        if report.status != StageStatus::Failed && report.counts.failed > 0 {
            report.status = StageStatus::Partial;
        }
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            stage = %stage,
            status = %report.status,
            attempted = report.counts.attempted,
            succeeded = report.counts.succeeded,
            missing_endpoints = report.counts.missing_endpoints,
            "stage finished"
        );
        report
    }
}

fn log_unmapped(stage: Stage, cursor: i64, error: &MappingError) {
    warn!(stage = %stage, row = cursor, error = %error, "skipping unmappable row");
}

fn check_source(config: &MigrationConfig) -> MigrationResult<()> {
    config.validate()?;
    if !config.source.exists() {
        return Err(MigrationError::SourceNotFound(config.source.clone()));
    }
    Ok(())
}

/// The migration only reads the catalog, so it never opens it for writing
fn open_source(config: &MigrationConfig) -> MigrationResult<CatalogStore> {
    check_source(config)?;
    Ok(CatalogStore::open_read_only(&config.source)?)
}

/// Migrate `catalog` into `graph` with the settings from `config`
pub fn migrate_into(
    catalog: &CatalogStore,
    graph: &mut GraphStore,
    config: &MigrationConfig,
) -> MigrationReport {
    let mut report = Migrator::from_config(catalog, &mut *graph, config).run();
    report.graph = Some(graph.statistics());
    report
}

/// Open the configured catalog and target, migrate, and save the target.
///
/// Failing to open the catalog, or to load or save the snapshot, aborts the
/// run. Everything below that is recorded in the report instead.
pub fn migrate(config: &MigrationConfig) -> MigrationResult<MigrationReport> {
    let catalog = open_source(config)?;
    let mut graph = match &config.target {
        Some(path) => GraphStore::open_snapshot(path)?,
        None => GraphStore::new(),
    };

    let report = migrate_into(&catalog, &mut graph, config);
    if let Some(path) = &config.target {
        graph.save_snapshot(path)?;
    }
    Ok(report)
}

/// Link the catalog, then migrate it
pub fn link_and_migrate(config: &MigrationConfig) -> MigrationResult<(LinkReport, MigrationReport)> {
    check_source(config)?;
    let catalog = CatalogStore::open(&config.source)?;
    let link_report = link_catalog(&catalog, config.link_strategy)?;
    drop(catalog);

    let report = migrate(config)?;
    Ok((link_report, report))
}
