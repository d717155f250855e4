//! Main DataProbe struct and public API.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ProbeError, Result};
use crate::expression::{Evaluation, ExpressionEvaluator};
use crate::inference::{ColumnTypeInfo, TypeClassifier};
use crate::input::{ColumnSource, Parser, ParserConfig, SourceMetadata, TabularDataset};
use crate::profile::{DatasetMetrics, Profiler, ProfilerConfig};
use crate::quality::{QualityIssueDetector, QualityThresholds};
use crate::validation::{RuleValidationEngine, ValidationReport, ValidationRule, parse_rule_sentences};

/// Configuration for profiling and validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub profiler: ProfilerConfig,
    pub quality: QualityThresholds,
    pub parser: ParserConfig,
}

impl ProbeConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ProbeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text)
            .map_err(|e| ProbeError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Result of analyzing a data file.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Metadata about the source file.
    pub source: SourceMetadata,
    /// Profiling metrics with quality issues.
    pub metrics: DatasetMetrics,
    /// Validation report, when rules were given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

/// Profiling and rule-validation engine.
///
/// Holds only configuration; every call works on the dataset it is given
/// and keeps nothing afterwards.
pub struct DataProbe {
    parser: Parser,
    profiler: Profiler,
    detector: QualityIssueDetector,
    classifier: TypeClassifier,
    validation: RuleValidationEngine,
}

impl DataProbe {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(ProbeConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: ProbeConfig) -> Self {
        let classifier = TypeClassifier::new(config.profiler.sample_size);
        Self {
            parser: Parser::with_config(config.parser),
            profiler: Profiler::new(config.profiler),
            detector: QualityIssueDetector::new(config.quality),
            validation: RuleValidationEngine::new(classifier.clone()),
            classifier,
        }
    }

    /// Profile a dataset and annotate quality issues.
    pub fn profile(&self, dataset: &TabularDataset) -> DatasetMetrics {
        let mut metrics = self.profiler.profile(dataset);
        self.detector.annotate(&mut metrics);
        metrics
    }

    /// Validate a dataset against a rule list.
    pub fn validate(&self, dataset: &TabularDataset, rules: &[ValidationRule]) -> ValidationReport {
        self.validation.validate(dataset, rules)
    }

    /// Classify one column of a dataset.
    pub fn classify_column(&self, dataset: &TabularDataset, column: &str) -> Result<ColumnTypeInfo> {
        dataset
            .column(column)
            .map(|c| self.classifier.classify(c))
            .ok_or_else(|| ProbeError::ColumnNotFound(column.to_string()))
    }

    /// Evaluate an arithmetic expression over a dataset's columns.
    pub fn evaluate_expression(
        &self,
        dataset: &TabularDataset,
        expression: &str,
        decimal_places: Option<u32>,
    ) -> Result<Evaluation> {
        ExpressionEvaluator::new(self.classifier.clone())
            .with_decimal_places(decimal_places)
            .evaluate(dataset, expression)
    }

    /// Parse a file, profile it, and validate it when rules are given.
    pub fn analyze_file(
        &self,
        path: impl AsRef<Path>,
        rules: Option<&[ValidationRule]>,
    ) -> Result<AnalysisResult> {
        let (dataset, source) = self.parser.parse_file(path)?;
        info!(
            file = %source.file,
            rows = source.row_count,
            columns = source.column_count,
            "parsed source"
        );

        let metrics = self.profile(&dataset);
        let validation = rules.map(|rules| self.validate(&dataset, rules));
        Ok(AnalysisResult {
            source,
            metrics,
            validation,
        })
    }
}

impl Default for DataProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Load rules from a file.
///
/// `.json` files hold either a rule array or an object with a `rules`
/// array. Any other file is read as one plain-English rule per line.
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<ValidationRule>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RuleFile {
        List(Vec<ValidationRule>),
        Wrapped { rules: Vec<ValidationRule> },
    }

    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Ok(parse_rule_sentences(&text));
    }
    Ok(match serde_json::from_str::<RuleFile>(&text)? {
        RuleFile::List(rules) | RuleFile::Wrapped { rules } => rules,
    })
}
