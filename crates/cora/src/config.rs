//! Pipeline configuration.
//!
//! A configuration file lists independent pipelines, one per target
//! frequency. Each pipeline names its sources and, per column, the resampling
//! policy and derived transforms to apply.
//!
//! ```toml
//! [[pipeline]]
//! name = "monthly"
//! frequency = "monthly"
//!
//! [pipeline.clustering]
//! k = 3
//!
//! [[pipeline.source]]
//! name = "metals"
//! path = "data/metals.csv"
//!
//! [[pipeline.source.column]]
//! name = "gold"
//! frequency = "daily"
//! policy = "last_of_period"
//! derive = ["log_level", "log_return"]
//! ```

use cora_data::{ColumnSpec, Frequency, GapFill, ResamplePolicy, Series, TableSpec, TransformClass};
use cora_output::ExportConfig;
use cora_stats::RollingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or checking a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Cannot read config {path}: {error}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        error: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two pipelines share a name
    #[error("Duplicate pipeline name: {0}")]
    DuplicatePipeline(String),

    /// A column changes frequency without a resampling policy
    #[error("Pipeline {pipeline}: column {column} needs a policy to go from {from} to {to}")]
    MissingPolicy {
        /// Pipeline name
        pipeline: String,
        /// Column name
        column: String,
        /// Native frequency
        from: Frequency,
        /// Target frequency
        to: Frequency,
    },

    /// Any other invalid setting
    #[error("Pipeline {pipeline}: {reason}")]
    Invalid {
        /// Pipeline name
        pipeline: String,
        /// What is wrong
        reason: String,
    },
}

const fn default_top_k() -> usize {
    15
}

const fn default_clusters() -> usize {
    3
}

fn default_date_column() -> String {
    "date".to_string()
}

/// Transforms derived from a raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// Natural log of the level, column `log_{name}`
    LogLevel,
    /// Log return between consecutive rows, column `log_return_{name}`
    LogReturn,
}

impl Derivation {
    /// Derived series for `series`, at the series' own frequency.
    pub fn apply(self, series: &Series) -> Series {
        match self {
            Self::LogLevel => series.log_level(),
            Self::LogReturn => series.log_return(),
        }
    }
}

/// One column of a source and how it enters the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Column metadata
    #[serde(flatten)]
    pub spec: ColumnSpec,

    /// Resampling policy; required when the native frequency differs from the
    /// target, `last_of_period` otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ResamplePolicy>,

    /// Derived transforms to add alongside the column
    #[serde(default)]
    pub derive: Vec<Derivation>,

    /// Include the column in rolling correlations
    #[serde(default)]
    pub rolling: bool,
}

impl ColumnConfig {
    /// Column with no policy, derivations or rolling flag.
    pub const fn new(spec: ColumnSpec) -> Self {
        Self {
            spec,
            policy: None,
            derive: Vec::new(),
            rolling: false,
        }
    }

    /// Set the resampling policy.
    pub const fn with_policy(mut self, policy: ResamplePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Add derived transforms.
    pub fn with_derive(mut self, derive: &[Derivation]) -> Self {
        self.derive.extend_from_slice(derive);
        self
    }

    /// Mark for rolling correlation.
    pub const fn with_rolling(mut self) -> Self {
        self.rolling = true;
        self
    }
}

/// A source table feeding a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name
    pub name: String,

    /// Path to the table, relative paths resolved against the config file
    pub path: PathBuf,

    /// Timestamp column (default: `date`)
    #[serde(default = "default_date_column")]
    pub date_column: String,

    /// Columns to load
    #[serde(rename = "column", default)]
    pub columns: Vec<ColumnConfig>,
}

impl SourceConfig {
    /// Table spec for the loader.
    pub fn table_spec(&self) -> TableSpec {
        TableSpec {
            name: self.name.clone(),
            path: self.path.clone(),
            date_column: self.date_column.clone(),
            columns: self.columns.iter().map(|c| c.spec.clone()).collect(),
        }
    }
}

/// Flat clustering settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Number of clusters (default: 3)
    #[serde(default = "default_clusters")]
    pub k: usize,

    /// Transform class whose matrix is clustered (default: raw)
    #[serde(default)]
    pub class: TransformClass,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: default_clusters(),
            class: TransformClass::Raw,
        }
    }
}

/// One frequency pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name, used in output file names
    pub name: String,

    /// Target frequency of the merged panel
    pub frequency: Frequency,

    /// Gap filling after the merge (default: forward then backward)
    #[serde(default)]
    pub gap_fill: GapFill,

    /// Pairs kept per correlation matrix (default: 15)
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Rolling correlation settings; omitted to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling: Option<RollingConfig>,

    /// Clustering settings; omitted to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clustering: Option<ClusteringConfig>,

    /// Source tables
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
}

impl PipelineConfig {
    /// Pipeline with defaults and no sources.
    pub fn new(name: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            name: name.into(),
            frequency,
            gap_fill: GapFill::default(),
            top_k: default_top_k(),
            rolling: None,
            clustering: None,
            sources: Vec::new(),
        }
    }

    /// Policy for `column`, checked against this pipeline's frequency.
    ///
    /// A column already at the target frequency defaults to
    /// [`ResamplePolicy::LastOfPeriod`], which moves its dates onto the
    /// period starts of the grid.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingPolicy`] if the column changes frequency
    /// without a policy, or [`ConfigError::Invalid`] if the policy points the
    /// wrong way.
    pub fn policy_for(&self, column: &ColumnConfig) -> Result<ResamplePolicy, ConfigError> {
        let native = column.spec.frequency;
        match column.policy {
            None if native == self.frequency => Ok(ResamplePolicy::LastOfPeriod),
            None => Err(ConfigError::MissingPolicy {
                pipeline: self.name.clone(),
                column: column.spec.name.clone(),
                from: native,
                to: self.frequency,
            }),
            Some(policy) if policy.supports(native, self.frequency) => Ok(policy),
            Some(policy) => Err(ConfigError::Invalid {
                pipeline: self.name.clone(),
                reason: format!(
                    "policy {} cannot move column {} from {} to {}",
                    policy, column.spec.name, native, self.frequency
                ),
            }),
        }
    }

    /// Check the pipeline's settings.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            pipeline: self.name.clone(),
            reason,
        };

        if self.sources.is_empty() {
            return Err(invalid("no sources".to_string()));
        }
        if let Some(rolling) = &self.rolling {
            rolling.validate().map_err(|e| invalid(e.to_string()))?;
        }
        if let Some(clustering) = &self.clustering
            && clustering.k == 0
        {
            return Err(invalid("clustering k must be at least 1".to_string()));
        }

        for source in &self.sources {
            if source.columns.is_empty() {
                return Err(invalid(format!("source {} has no columns", source.name)));
            }
            for column in &source.columns {
                self.policy_for(column)?;
            }
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoraConfig {
    /// Pipelines in file order
    #[serde(rename = "pipeline", default)]
    pub pipelines: Vec<PipelineConfig>,

    /// Output settings; the command line may override them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ExportConfig>,
}

impl CoraConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not a valid configuration.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// Relative source paths are resolved against the file's directory.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let mut config = Self::from_toml(&text)?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Make relative source and output paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for source in self.pipelines.iter_mut().flat_map(|p| p.sources.iter_mut()) {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        if let Some(output) = &mut self.output
            && output.out_dir.is_relative()
        {
            output.out_dir = base.join(&output.out_dir);
        }
    }

    /// Check every pipeline and that pipeline names are unique.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for pipeline in &self.pipelines {
            if !names.insert(pipeline.name.as_str()) {
                return Err(ConfigError::DuplicatePipeline(pipeline.name.clone()));
            }
            pipeline.validate()?;
        }
        Ok(())
    }

    /// Distinct sources across all pipelines, first occurrence wins.
    pub fn sources(&self) -> Vec<&SourceConfig> {
        let mut seen = HashSet::new();
        self.pipelines
            .iter()
            .flat_map(|p| p.sources.iter())
            .filter(|s| seen.insert(s.name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cora_stats::Downsample;
    use rstest::rstest;

    const SAMPLE: &str = r#"
[output]
out_dir = "out"

[[pipeline]]
name = "daily"
frequency = "daily"
top_k = 10

[pipeline.rolling]
downsample = "monthly"

[[pipeline.source]]
name = "market"
path = "market.csv"

[[pipeline.source.column]]
name = "close"
rename = "spx_close"
frequency = "daily"
derive = ["log_level", "log_return"]
rolling = true

[[pipeline.source.column]]
name = "cpi"
frequency = "monthly"
policy = "expand_forward_fill"

[[pipeline]]
name = "annual"
frequency = "annual"
gap_fill = "forward_only"

[pipeline.clustering]
class = "log_returns"

[[pipeline.source]]
name = "market"
path = "market.csv"
date_column = "Date"

[[pipeline.source.column]]
name = "close"
frequency = "daily"
policy = "last_of_period"
"#;

    #[test]
    fn test_parse_sample() {
        let config = CoraConfig::from_toml(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.pipelines.len(), 2);
        let daily = &config.pipelines[0];
        assert_eq!(daily.frequency, Frequency::Daily);
        assert_eq!(daily.top_k, 10);
        assert_eq!(daily.gap_fill, GapFill::ForwardThenBackward);
        assert!(daily.clustering.is_none());

        let rolling = daily.rolling.as_ref().unwrap();
        assert_eq!(rolling.downsample, Downsample::Monthly);
        assert_eq!(rolling.windows.len(), 4);
        assert_eq!(rolling.current_window, 60);

        let close = &daily.sources[0].columns[0];
        assert_eq!(close.spec.output_name(), "spx_close");
        assert_eq!(close.derive, vec![Derivation::LogLevel, Derivation::LogReturn]);
        assert!(close.rolling);
        assert_eq!(daily.sources[0].date_column, "date");

        let annual = &config.pipelines[1];
        assert_eq!(annual.top_k, 15);
        assert_eq!(annual.gap_fill, GapFill::ForwardOnly);
        let clustering = annual.clustering.unwrap();
        assert_eq!(clustering.k, 3);
        assert_eq!(clustering.class, TransformClass::LogReturn);

        assert_eq!(config.sources().len(), 1);
        assert_eq!(config.output.unwrap().precision, 4);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = CoraConfig::from_toml(SAMPLE).unwrap();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(CoraConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_policy() {
        let mut pipeline = PipelineConfig::new("monthly", Frequency::Monthly);
        pipeline.sources.push(SourceConfig {
            name: "fx".to_string(),
            path: PathBuf::from("fx.csv"),
            date_column: "date".to_string(),
            columns: vec![ColumnConfig::new(ColumnSpec::new("eurusd", Frequency::Daily))],
        });

        assert!(matches!(
            pipeline.validate(),
            Err(ConfigError::MissingPolicy { ref column, .. }) if column == "eurusd"
        ));

        pipeline.sources[0].columns[0].policy = Some(ResamplePolicy::ExpandForwardFill);
        assert!(matches!(pipeline.validate(), Err(ConfigError::Invalid { .. })));

        pipeline.sources[0].columns[0].policy = Some(ResamplePolicy::MeanOfPeriod);
        pipeline.validate().unwrap();
    }

    #[rstest]
    #[case(Frequency::Daily, None, Ok(ResamplePolicy::LastOfPeriod))]
    #[case(Frequency::Monthly, None, Err(()))]
    #[case(
        Frequency::Annual,
        Some(ResamplePolicy::ExpandForwardFill),
        Ok(ResamplePolicy::ExpandForwardFill)
    )]
    #[case(
        Frequency::Daily,
        Some(ResamplePolicy::MeanOfPeriod),
        Ok(ResamplePolicy::MeanOfPeriod)
    )]
    #[case(Frequency::Monthly, Some(ResamplePolicy::LastOfPeriod), Err(()))]
    fn test_policy_for_daily_pipeline(
        #[case] native: Frequency,
        #[case] policy: Option<ResamplePolicy>,
        #[case] expected: Result<ResamplePolicy, ()>,
    ) {
        let pipeline = PipelineConfig::new("daily", Frequency::Daily);
        let mut column = ColumnConfig::new(ColumnSpec::new("x", native));
        column.policy = policy;
        assert_eq!(pipeline.policy_for(&column).map_err(|_| ()), expected);
    }

    #[test]
    fn test_duplicate_pipeline_names() {
        let mut pipeline = PipelineConfig::new("daily", Frequency::Daily);
        pipeline.sources.push(SourceConfig {
            name: "s".to_string(),
            path: PathBuf::from("s.csv"),
            date_column: "date".to_string(),
            columns: vec![ColumnConfig::new(ColumnSpec::new("x", Frequency::Daily))],
        });
        let config = CoraConfig {
            pipelines: vec![pipeline.clone(), pipeline],
            output: None,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePipeline(name)) if name == "daily"
        ));
    }

    #[test]
    fn test_bad_settings() {
        let mut pipeline = PipelineConfig::new("daily", Frequency::Daily);
        assert!(pipeline.validate().is_err());

        pipeline.sources.push(SourceConfig {
            name: "s".to_string(),
            path: PathBuf::from("s.csv"),
            date_column: "date".to_string(),
            columns: vec![ColumnConfig::new(ColumnSpec::new("x", Frequency::Daily))],
        });
        pipeline.clustering = Some(ClusteringConfig {
            k: 0,
            class: TransformClass::Raw,
        });
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let mut config = CoraConfig::from_toml(SAMPLE).unwrap();
        config.resolve_paths(Path::new("/data/cora"));
        assert_eq!(
            config.pipelines[0].sources[0].path,
            PathBuf::from("/data/cora/market.csv")
        );
        assert_eq!(
            config.output.unwrap().out_dir,
            PathBuf::from("/data/cora/out")
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CoraConfig::from_toml("[[pipeline]]\nname = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
