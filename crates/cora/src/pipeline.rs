//! The frequency pipeline.
//!
//! One pipeline loads its sources, moves every column onto the target
//! frequency, adds derived log columns, merges everything into one panel and
//! runs the statistics engines over it. Pipelines share nothing but their
//! read-only inputs, so [`run_pipelines`] runs them in parallel.

use crate::config::{ConfigError, CoraConfig, Derivation, PipelineConfig, SourceConfig};
use cora_data::{
    DataError, Frequency, Panel, ResamplePolicy, Series, TableLoader, TransformClass, merge,
    normalize,
};
use cora_output::{ClassSummary, ExportError, OutputWriter, PipelineSummary};
use cora_stats::{
    ClusterResult, CorrelationMatrix, CorrelationPair, RollingPair, StatsError, cluster,
    correlate_by_class, correlate_columns, rolling_correlations, top_k,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Errors that stop a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source table could not be loaded or prepared
    #[error("Pipeline {pipeline}: source {source_name}: {error}")]
    Source {
        /// Pipeline name
        pipeline: String,
        /// Source name
        source_name: String,
        /// Underlying error
        #[source]
        error: DataError,
    },

    /// The merge failed
    #[error("Pipeline {pipeline}: {error}")]
    Data {
        /// Pipeline name
        pipeline: String,
        /// Underlying error
        #[source]
        error: DataError,
    },

    /// A statistics engine failed
    #[error("Pipeline {pipeline}: {error}")]
    Stats {
        /// Pipeline name
        pipeline: String,
        /// Underlying error
        #[source]
        error: StatsError,
    },

    /// The pipeline configuration is inconsistent
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Results could not be written
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Rolling correlations of one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingOutput {
    /// Columns the pairs were drawn from
    pub assets: Vec<String>,
    /// One entry per pair
    pub pairs: Vec<RollingPair>,
}

/// Everything one pipeline produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Pipeline name
    pub name: String,
    /// Target frequency
    pub frequency: Frequency,
    /// Merged, gap-filled panel
    pub panel: Panel,
    /// One matrix per transform class with at least two columns
    pub correlations: BTreeMap<TransformClass, CorrelationMatrix>,
    /// Strongest pairs of each matrix
    pub top_pairs: BTreeMap<TransformClass, Vec<CorrelationPair>>,
    /// Rolling correlations, when configured and at least two columns qualify
    pub rolling: Option<RollingOutput>,
    /// Flat clusters, when configured and the matrix exists
    pub clusters: Option<ClusterResult>,
}

impl PipelineOutput {
    /// Condensed view for terminals and reports.
    pub fn summary(&self) -> PipelineSummary {
        let mut summary = PipelineSummary::new(
            self.name.clone(),
            self.frequency.to_string(),
            self.panel.len(),
            self.panel.width(),
        );
        summary.period_start = self.panel.index().first().copied();
        summary.period_end = self.panel.index().last().copied();
        summary.classes = self
            .correlations
            .iter()
            .map(|(class, matrix)| ClassSummary {
                class: class.label().to_string(),
                assets: matrix.len(),
                strongest: self
                    .top_pairs
                    .get(class)
                    .and_then(|pairs| pairs.first())
                    .map(|p| (p.asset_a.clone(), p.asset_b.clone(), p.correlation)),
            })
            .collect();
        summary.rolling_pairs = self.rolling.as_ref().map_or(0, |r| r.pairs.len());
        summary.clusters = self
            .clusters
            .as_ref()
            .map(|c| c.clusters.iter().map(|c| c.members.clone()).collect())
            .unwrap_or_default();
        summary
    }

    /// Write every result file of this pipeline.
    ///
    /// # Errors
    /// Returns an error if a file cannot be written.
    pub fn write(&self, writer: &OutputWriter) -> Result<Vec<PathBuf>, ExportError> {
        let mut paths = vec![writer.write_merged(&self.name, &self.panel)?];

        for (class, matrix) in &self.correlations {
            paths.extend(writer.write_correlation(&self.name, *class, matrix)?);
        }
        for (class, pairs) in &self.top_pairs {
            paths.push(writer.write_top_pairs(&self.name, *class, pairs)?);
        }
        if let Some(rolling) = &self.rolling {
            paths.push(writer.write_rolling(&self.name, rolling.assets.clone(), &rolling.pairs)?);
        }
        if let Some(clusters) = &self.clusters {
            paths.push(writer.write_clusters(&self.name, clusters)?);
        }

        Ok(paths)
    }
}

/// Series of one source on the pipeline grid, plus the rolling column names.
fn prepare_source(
    config: &PipelineConfig,
    source: &SourceConfig,
    loader: &dyn TableLoader,
) -> Result<(Panel, Vec<String>), PipelineError> {
    let source_error = |error: DataError| PipelineError::Source {
        pipeline: config.name.clone(),
        source_name: source.name.clone(),
        error,
    };

    let table = loader.load(&source.table_spec()).map_err(source_error)?;

    let mut series = Vec::new();
    let mut rolling = Vec::new();
    for (column, loaded) in source.columns.iter().zip(table.series()) {
        let policy = config.policy_for(column)?;
        let aligned = normalize(loaded, config.frequency, policy).map_err(source_error)?;

        for derivation in &column.derive {
            let derived = match (derivation, policy) {
                // Returns over a coarser grid span whole periods
                (
                    Derivation::LogReturn,
                    ResamplePolicy::LastOfPeriod | ResamplePolicy::MeanOfPeriod,
                ) => derivation.apply(&aligned),
                _ => normalize(&derivation.apply(loaded), config.frequency, policy)
                    .map_err(source_error)?,
            };
            series.push(derived);
        }
        if column.rolling {
            rolling.push(aligned.name().to_string());
        }
        series.push(aligned);
    }

    // Derived columns follow their base columns
    series.sort_by_key(Series::class);
    let panel = Panel::from_series(&series).map_err(source_error)?;

    debug!(
        source = %source.name,
        rows = panel.len(),
        columns = panel.width(),
        "prepared source"
    );

    Ok((panel, rolling))
}

/// Run one pipeline to completion.
///
/// # Errors
/// Returns [`PipelineError::Source`] if a source cannot be loaded, and other
/// variants if merging or a statistics engine fails.
pub fn run_pipeline(
    config: &PipelineConfig,
    loader: &dyn TableLoader,
) -> Result<PipelineOutput, PipelineError> {
    let span = info_span!("pipeline", name = %config.name, frequency = %config.frequency);
    let _guard = span.enter();

    let mut panels = Vec::with_capacity(config.sources.len());
    let mut rolling_columns = Vec::new();
    for source in &config.sources {
        let (panel, rolling) = prepare_source(config, source, loader)?;
        panels.push(panel);
        rolling_columns.extend(rolling);
    }

    let panel = merge(&panels, config.gap_fill).map_err(|error| PipelineError::Data {
        pipeline: config.name.clone(),
        error,
    })?;
    info!(rows = panel.len(), columns = panel.width(), "merged panel");

    let stats_error = |error: StatsError| PipelineError::Stats {
        pipeline: config.name.clone(),
        error,
    };

    let correlations = correlate_by_class(&panel);
    let top_pairs = correlations
        .iter()
        .map(|(class, matrix)| (*class, top_k(matrix, config.top_k)))
        .collect();

    let rolling = match &config.rolling {
        Some(rolling_config) => {
            // Columns emptied by the merge are skipped
            let assets: Vec<String> = rolling_columns
                .into_iter()
                .filter(|name| panel.column(name).is_some())
                .collect();
            if assets.len() < 2 {
                debug!(columns = assets.len(), "skipping rolling correlations");
                None
            } else {
                let names: Vec<&str> = assets.iter().map(String::as_str).collect();
                let pairs =
                    rolling_correlations(&panel, &names, rolling_config).map_err(stats_error)?;
                Some(RollingOutput { assets, pairs })
            }
        }
        None => None,
    };

    let clusters = match &config.clustering {
        Some(clustering) => match correlations.get(&clustering.class) {
            Some(matrix) => Some(cluster(matrix, clustering.k).map_err(stats_error)?),
            None => {
                warn!(class = %clustering.class, "no correlation matrix to cluster");
                None
            }
        },
        None => None,
    };

    info!(
        matrices = correlations.len(),
        rolling_pairs = rolling.as_ref().map_or(0, |r: &RollingOutput| r.pairs.len()),
        clustered = clusters.is_some(),
        "pipeline complete"
    );

    Ok(PipelineOutput {
        name: config.name.clone(),
        frequency: config.frequency,
        panel,
        correlations,
        top_pairs,
        rolling,
        clusters,
    })
}

/// Run every configured pipeline in parallel.
///
/// Results come back in configuration order; one failing pipeline does not
/// stop the others.
pub fn run_pipelines<L>(config: &CoraConfig, loader: &L) -> Vec<Result<PipelineOutput, PipelineError>>
where
    L: TableLoader + Sync,
{
    config
        .pipelines
        .par_iter()
        .map(|pipeline| run_pipeline(pipeline, loader))
        .collect()
}

/// Correlation matrix over every loaded and derived column of one source.
///
/// Columns keep their native frequency. Returns `None` when the source has
/// fewer than two columns.
///
/// # Errors
/// Returns [`DataError`] if the source cannot be loaded.
pub fn within_source(
    source: &SourceConfig,
    loader: &dyn TableLoader,
) -> Result<Option<CorrelationMatrix>, DataError> {
    let table = loader.load(&source.table_spec())?;

    let mut series = Vec::new();
    for (column, loaded) in source.columns.iter().zip(table.series()) {
        series.push(loaded.clone());
        series.extend(column.derive.iter().map(|derivation| derivation.apply(loaded)));
    }

    let panel = Panel::from_series(&series)?;
    if panel.width() < 2 {
        return Ok(None);
    }

    let names = panel.column_names();
    let columns: Vec<&[Option<f64>]> = panel.columns().iter().map(|c| c.values()).collect();
    Ok(correlate_columns(&names, &columns).ok())
}

/// Within-source matrices for every distinct source in `config`, keyed by source name.
///
/// A source that cannot be loaded is logged and skipped.
pub fn within_sources(
    config: &CoraConfig,
    loader: &dyn TableLoader,
) -> BTreeMap<String, CorrelationMatrix> {
    let mut matrices = BTreeMap::new();
    for source in config.sources() {
        match within_source(source, loader) {
            Ok(Some(matrix)) => {
                matrices.insert(source.name.clone(), matrix);
            }
            Ok(None) => debug!(source = %source.name, "fewer than two columns, no matrix"),
            Err(error) => warn!(source = %source.name, %error, "skipping source"),
        }
    }
    matrices
}
