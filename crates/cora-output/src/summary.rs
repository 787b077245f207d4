//! Human-readable pipeline summaries.
//!
//! A [`PipelineSummary`] condenses one pipeline run into the panel shape, the
//! strongest pair of each correlation matrix and the cluster layout, and
//! renders it as an ASCII table for terminals or as Markdown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongest pair of one transform class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassSummary {
    /// Transform class label.
    pub class: String,

    /// Number of assets in the matrix.
    pub assets: usize,

    /// Strongest pair as `(asset_a, asset_b, correlation)`.
    pub strongest: Option<(String, String, f64)>,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSummary {
    /// Pipeline name.
    pub name: String,

    /// Target frequency name.
    pub frequency: String,

    /// First date of the merged panel.
    pub period_start: Option<NaiveDate>,

    /// Last date of the merged panel.
    pub period_end: Option<NaiveDate>,

    /// Rows in the merged panel.
    pub rows: usize,

    /// Columns in the merged panel.
    pub columns: usize,

    /// One entry per correlated transform class.
    pub classes: Vec<ClassSummary>,

    /// Number of rolling pairs computed.
    pub rolling_pairs: usize,

    /// Cluster members by cluster id order.
    pub clusters: Vec<Vec<String>>,
}

impl PipelineSummary {
    /// Create a summary with no statistics attached.
    pub const fn new(name: String, frequency: String, rows: usize, columns: usize) -> Self {
        Self {
            name,
            frequency,
            period_start: None,
            period_end: None,
            rows,
            columns,
            classes: Vec::new(),
            rolling_pairs: 0,
            clusters: Vec::new(),
        }
    }

    fn period(&self) -> String {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "empty".to_string(),
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nPipeline: {} ({})\n", self.name, self.frequency));
        output.push_str(&format!("Period: {}\n", self.period()));
        output.push_str(&"=".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "  Panel:                    {} rows x {} columns\n",
            self.rows, self.columns
        ));
        output.push_str(&format!(
            "  Rolling pairs:            {}\n",
            self.rolling_pairs
        ));

        if !self.classes.is_empty() {
            output.push_str("\nCorrelation Matrices:\n");
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!(
                "{:<14} {:>8}   {:<44} {:>8}\n",
                "Class", "Assets", "Strongest pair", "r"
            ));
            output.push_str(&"-".repeat(80));
            output.push('\n');

            for class in &self.classes {
                match &class.strongest {
                    Some((a, b, r)) => output.push_str(&format!(
                        "{:<14} {:>8}   {:<44} {:>8.4}\n",
                        class.class,
                        class.assets,
                        format!("{} / {}", a, b),
                        r
                    )),
                    None => output.push_str(&format!(
                        "{:<14} {:>8}   {:<44} {:>8}\n",
                        class.class, class.assets, "-", "-"
                    )),
                }
            }
        }

        if !self.clusters.is_empty() {
            output.push_str("\nClusters:\n");
            output.push_str(&"-".repeat(80));
            output.push('\n');
            for (i, members) in self.clusters.iter().enumerate() {
                output.push_str(&format!("  {:>2}: {}\n", i + 1, members.join(", ")));
            }
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Pipeline: {}\n\n", self.name));
        output.push_str(&format!("**Frequency:** {}\n\n", self.frequency));
        output.push_str(&format!("**Period:** {}\n\n", self.period()));
        output.push_str(&format!(
            "- **Panel:** {} rows x {} columns\n",
            self.rows, self.columns
        ));
        output.push_str(&format!("- **Rolling pairs:** {}\n\n", self.rolling_pairs));

        if !self.classes.is_empty() {
            output.push_str("## Correlation Matrices\n\n");
            output.push_str("| Class | Assets | Strongest pair | r |\n");
            output.push_str("|-------|--------|----------------|---|\n");
            for class in &self.classes {
                match &class.strongest {
                    Some((a, b, r)) => output.push_str(&format!(
                        "| {} | {} | {} / {} | {:.4} |\n",
                        class.class, class.assets, a, b, r
                    )),
                    None => output.push_str(&format!(
                        "| {} | {} | - | - |\n",
                        class.class, class.assets
                    )),
                }
            }
            output.push('\n');
        }

        if !self.clusters.is_empty() {
            output.push_str("## Clusters\n\n");
            for (i, members) in self.clusters.iter().enumerate() {
                output.push_str(&format!("{}. {}\n", i + 1, members.join(", ")));
            }
        }

        output
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Pipeline {} ({}): {} rows x {} columns, {}",
            self.name,
            self.frequency,
            self.rows,
            self.columns,
            self.period()
        )?;
        for class in &self.classes {
            writeln!(f, "  {} matrix: {} assets", class.class, class.assets)?;
        }
        if !self.clusters.is_empty() {
            writeln!(f, "  {} clusters", self.clusters.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> PipelineSummary {
        let mut summary = PipelineSummary::new("monthly".to_string(), "monthly".to_string(), 120, 6);
        summary.period_start = NaiveDate::from_ymd_opt(2015, 1, 1);
        summary.period_end = NaiveDate::from_ymd_opt(2024, 12, 1);
        summary.classes = vec![
            ClassSummary {
                class: "raw".to_string(),
                assets: 4,
                strongest: Some(("gold".to_string(), "silver".to_string(), 0.9123)),
            },
            ClassSummary {
                class: "log".to_string(),
                assets: 2,
                strongest: None,
            },
        ];
        summary.rolling_pairs = 6;
        summary.clusters = vec![
            vec!["gold".to_string(), "silver".to_string()],
            vec!["oil".to_string()],
        ];
        summary
    }

    #[test]
    fn test_ascii_table() {
        let table = summary().to_ascii_table();
        assert!(table.contains("Pipeline: monthly (monthly)"));
        assert!(table.contains("2015-01-01 to 2024-12-01"));
        assert!(table.contains("gold / silver"));
        assert!(table.contains("0.9123"));
        assert!(table.contains(" 1: gold, silver"));
    }

    #[test]
    fn test_markdown() {
        let markdown = summary().to_markdown();
        assert!(markdown.contains("# Pipeline: monthly"));
        assert!(markdown.contains("| raw | 4 | gold / silver | 0.9123 |"));
        assert!(markdown.contains("| log | 2 | - | - |"));
        assert!(markdown.contains("2. oil"));
    }

    #[test]
    fn test_display_and_empty_period() {
        let empty = PipelineSummary::new("annual".to_string(), "annual".to_string(), 0, 0);
        assert!(empty.to_string().contains("empty"));
        assert!(summary().to_string().contains("2 clusters"));
    }
}
