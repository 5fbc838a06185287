use serde::{Deserialize, Serialize};
use crate::{
    transformation_engine::TransformationResult,
    transformation_rule::{StepOutcome, StepStatus, TransformationKind},
    validation::ValidationReport,
};

/// Reporter for rendering the outcome of a migration run
pub struct TransformationReporter {
    output_format: ReportFormat,
}

/// Available output formats for transformation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Console,
    Json,
    Yaml,
}

/// Everything a run did, per model and per kind of edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationReport {
    pub schema_path: String,
    pub written: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    pub outcomes: Vec<OutcomeEntry>,
    pub warnings: Vec<String>,
    pub validation_summary: ValidationSummary,
    pub transformation_summary: TransformationSummary,
}

/// One step outcome flattened for machine-readable output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub model: String,
    pub kind: TransformationKind,
    /// `applied`, `already_present` or `skipped`
    pub status: String,
    pub reason: Option<String>,
}

impl From<&StepOutcome> for OutcomeEntry {
    fn from(outcome: &StepOutcome) -> Self {
        let status = match outcome.status {
            StepStatus::Applied => "applied",
            StepStatus::AlreadyPresent => "already_present",
            StepStatus::Skipped(_) => "skipped",
        };
        Self {
            model: outcome.model.clone(),
            kind: outcome.kind,
            status: status.to_string(),
            reason: outcome.skip_reason().map(ToString::to_string),
        }
    }
}

/// Summary of validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_errors: usize,
    pub total_warnings: usize,
    pub is_valid: bool,
    pub warnings: Vec<String>,
}

/// Counts of outcomes across the run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationSummary {
    pub total_steps: usize,
    pub applied: usize,
    pub already_present: usize,
    pub skipped: usize,
    pub tenant_models_migrated: Vec<String>,
    pub year_models_migrated: Vec<String>,
}

impl TransformationReporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn generate_report(
        &self,
        schema_path: &str,
        written: bool,
        result: &TransformationResult,
    ) -> TransformationReport {
        TransformationReport {
            schema_path: schema_path.to_string(),
            written,
            backup_path: None,
            outcomes: result.outcomes.iter().map(OutcomeEntry::from).collect(),
            warnings: result.warnings.iter().map(|w| w.message.clone()).collect(),
            validation_summary: self.create_validation_summary(&result.validation_report),
            transformation_summary: self.create_transformation_summary(result),
        }
    }

    pub fn format_report(&self, report: &TransformationReport) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(self.format_console_report(report)),
            ReportFormat::Json => self.format_json_report(report),
            ReportFormat::Yaml => self.format_yaml_report(report),
        }
    }

    fn create_validation_summary(&self, report: &ValidationReport) -> ValidationSummary {
        ValidationSummary {
            total_errors: report.errors.len(),
            total_warnings: report.warnings.len(),
            is_valid: report.is_valid,
            warnings: report
                .warnings
                .iter()
                .map(|w| format!("{}: {}", w.model, w.message))
                .collect(),
        }
    }

    fn create_transformation_summary(&self, result: &TransformationResult) -> TransformationSummary {
        let mut summary = TransformationSummary {
            total_steps: result.outcomes.len(),
            tenant_models_migrated: owned(result.applied_models(TransformationKind::TenantFields)),
            year_models_migrated: owned(result.applied_models(TransformationKind::YearScope)),
            ..TransformationSummary::default()
        };

        for outcome in &result.outcomes {
            match outcome.status {
                StepStatus::Applied => summary.applied += 1,
                StepStatus::AlreadyPresent => summary.already_present += 1,
                StepStatus::Skipped(_) => summary.skipped += 1,
            }
        }

        summary
    }

    fn format_console_report(&self, report: &TransformationReport) -> String {
        let mut output = String::new();

        let sections = [
            ("Tenant Scope", TransformationKind::TenantFields),
            ("Tenant Index", TransformationKind::TenantIndex),
            ("Academic Year Scope", TransformationKind::YearScope),
        ];

        for (title, kind) in sections {
            let entries: Vec<&OutcomeEntry> = report.outcomes.iter().filter(|e| e.kind == kind).collect();
            if entries.is_empty() {
                continue;
            }
            output.push_str(&format!("\n=== {} ===\n", title));
            for entry in entries {
                let line = match (entry.status.as_str(), &entry.reason) {
                    ("applied", _) => format!("  ✓ {}: {} added", entry.model, entry.kind),
                    ("already_present", _) => {
                        format!("  ℹ {}: {} already present", entry.model, entry.kind)
                    }
                    (_, Some(reason)) => format!("  ⚠ {}: skipped ({})", entry.model, reason),
                    (_, None) => format!("  ⚠ {}: skipped", entry.model),
                };
                output.push_str(&line);
                output.push('\n');
            }
        }

        let summary = &report.transformation_summary;
        output.push_str("\n=== Summary ===\n");
        output.push_str(&format!(
            "  Applied: {}, already present: {}, skipped: {}\n",
            summary.applied, summary.already_present, summary.skipped
        ));
        output.push_str(&format!(
            "  Tenant-scoped models: {}\n",
            list_or_none(&summary.tenant_models_migrated)
        ));
        output.push_str(&format!(
            "  Year-scoped models: {}\n",
            list_or_none(&summary.year_models_migrated)
        ));

        if !report.warnings.is_empty() {
            output.push_str(&format!("\n⚠ {} configured step(s) were not applied:\n", report.warnings.len()));
            for warning in &report.warnings {
                output.push_str(&format!("  • {}\n", warning));
            }
        }

        for warning in &report.validation_summary.warnings {
            output.push_str(&format!("  ⚠ {}\n", warning));
        }

        if let Some(backup) = &report.backup_path {
            output.push_str(&format!("\n  ✓ Backup: {}", backup));
        }
        if report.written {
            output.push_str(&format!("\n  ✓ Updated {}\n", report.schema_path));
        } else {
            output.push_str(&format!("\n  ℹ {} was not modified\n", report.schema_path));
        }

        output
    }

    fn format_json_report(&self, report: &TransformationReport) -> Result<String, ReportError> {
        serde_json::to_string_pretty(report).map_err(|e| ReportError::SerializationError(e.to_string()))
    }

    fn format_yaml_report(&self, report: &TransformationReport) -> Result<String, ReportError> {
        serde_yaml::to_string(report).map_err(|e| ReportError::SerializationError(e.to_string()))
    }
}

impl Default for TransformationReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformation_engine::TransformationWarning;
    use crate::transformation_rule::SkipReason;

    fn sample_result() -> TransformationResult {
        let outcomes = vec![
            StepOutcome::new("Student", TransformationKind::TenantFields, StepStatus::Applied),
            StepOutcome::new("Student", TransformationKind::TenantIndex, StepStatus::Applied),
            StepOutcome::new("Teacher", TransformationKind::TenantFields, StepStatus::AlreadyPresent),
            StepOutcome::new(
                "Teacher",
                TransformationKind::TenantIndex,
                StepStatus::Skipped(SkipReason::MappingAnnotationMissing),
            ),
            StepOutcome::new("Class", TransformationKind::YearScope, StepStatus::Applied),
        ];
        let warnings = outcomes.iter().filter_map(TransformationWarning::from_outcome).collect();

        TransformationResult {
            outcomes,
            warnings,
            validation_report: ValidationReport::new(),
        }
    }

    #[test]
    fn test_transformation_reporter_creation() {
        let reporter = TransformationReporter::new();
        assert!(matches!(reporter.output_format, ReportFormat::Console));
    }

    #[test]
    fn test_reporter_with_format() {
        let reporter = TransformationReporter::new().with_format(ReportFormat::Json);
        assert!(matches!(reporter.output_format, ReportFormat::Json));
    }

    #[test]
    fn test_generate_report_counts() {
        let reporter = TransformationReporter::new();
        let report = reporter.generate_report("schema.prisma", true, &sample_result());

        let summary = &report.transformation_summary;
        assert_eq!(summary.total_steps, 5);
        assert_eq!(summary.applied, 3);
        assert_eq!(summary.already_present, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.tenant_models_migrated, vec!["Student".to_string()]);
        assert_eq!(summary.year_models_migrated, vec!["Class".to_string()]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_format_console_report_distinguishes_skips() {
        let reporter = TransformationReporter::new();
        let report = reporter.generate_report("schema.prisma", true, &sample_result());

        let formatted = reporter.format_report(&report).unwrap();
        assert!(formatted.contains("=== Tenant Scope ==="));
        assert!(formatted.contains("✓ Student: tenant fields added"));
        assert!(formatted.contains("ℹ Teacher: tenant fields already present"));
        assert!(formatted.contains("⚠ Teacher: skipped (no @@map annotation to anchor the index)"));
        assert!(formatted.contains("Year-scoped models: Class"));
        assert!(formatted.contains("✓ Updated schema.prisma"));
    }

    #[test]
    fn test_format_json_report() {
        let reporter = TransformationReporter::new().with_format(ReportFormat::Json);
        let report = reporter.generate_report("schema.prisma", false, &sample_result());

        let formatted = reporter.format_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(value["written"], false);
        assert_eq!(value["transformation_summary"]["skipped"], 1);
        assert_eq!(value["outcomes"][0]["status"], "applied");
        assert_eq!(value["outcomes"][3]["status"], "skipped");
        assert_eq!(value["outcomes"][3]["reason"], "no @@map annotation to anchor the index");
        assert_eq!(value["outcomes"][3]["kind"], "tenant_index");
    }

    #[test]
    fn test_format_yaml_report() {
        let reporter = TransformationReporter::new().with_format(ReportFormat::Yaml);
        let report = reporter.generate_report("schema.prisma", true, &sample_result());

        let formatted = reporter.format_report(&report).unwrap();
        assert!(formatted.contains("schema_path: schema.prisma"));
        assert!(formatted.contains("tenant_models_migrated:"));
    }

    #[test]
    fn test_format_yaml_report_with_structured_skip_reason() {
        let reporter = TransformationReporter::new().with_format(ReportFormat::Yaml);
        let result = TransformationResult {
            outcomes: vec![StepOutcome::new(
                "Class",
                TransformationKind::YearScope,
                StepStatus::Skipped(SkipReason::AnchorNotFound {
                    anchor: "academicYear String @default(\"...\")".to_string(),
                }),
            )],
            warnings: Vec::new(),
            validation_report: ValidationReport::new(),
        };
        let report = reporter.generate_report("schema.prisma", false, &result);

        let formatted = reporter.format_report(&report).unwrap();
        assert!(formatted.contains("status: skipped"));
        assert!(formatted.contains("kind: year_scope"));
    }
}
