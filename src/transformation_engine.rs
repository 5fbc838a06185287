use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    reporter::ReportError,
    schema_document::{ModelBlock, ParseError, SchemaDocument},
    transformation_rule::{MigrationConfig, SkipReason, StepOutcome, StepStatus, TransformationKind},
    validation::{self, ValidationReport},
};

const IDENTIFIER_ANCHOR: &str = "String @id @default(...)";

/// Rewrites a schema document according to a [`MigrationConfig`]
pub struct SchemaTransformer {
    config: MigrationConfig,
}

/// Result of running every configured edit over a document
#[derive(Debug, Clone)]
pub struct TransformationResult {
    pub outcomes: Vec<StepOutcome>,
    pub warnings: Vec<TransformationWarning>,
    pub validation_report: ValidationReport,
}

/// A configured edit that could not be applied
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationWarning {
    pub message: String,
    pub model: String,
    pub kind: TransformationKind,
    pub warning_type: TransformationWarningType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformationWarningType {
    ModelNotFound,
    AnchorNotFound,
    FieldConflict,
    IndexNotInserted,
}

#[derive(Debug, Error)]
pub enum TransformationError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Schema parsing error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Transformed schema failed validation: {}", .0.summary())]
    ValidationFailed(ValidationReport),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl SchemaTransformer {
    pub fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Read and parse the schema at `path`
    pub fn load(path: &Path) -> Result<SchemaDocument, TransformationError> {
        let text = fs::read_to_string(path).map_err(|source| TransformationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(text.parse()?)
    }

    /// Overwrite `path` with the printed document.
    ///
    /// The text goes to a temporary file next to the target which is then
    /// renamed over it, so the target is either fully old or fully new.
    pub fn save(document: &SchemaDocument, path: &Path) -> Result<(), TransformationError> {
        let write_error = |source: io::Error| TransformationError::Write {
            path: path.to_path_buf(),
            source,
        };

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(directory).map_err(write_error)?;
        file.write_all(document.to_string().as_bytes()).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;

        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(file.path(), metadata.permissions()).map_err(write_error)?;
        }

        file.persist(path).map_err(|e| write_error(e.error))?;
        Ok(())
    }

    /// Copy `path` to the first free `<path>.bak`, `<path>.bak-1`, ... name
    pub fn backup(path: &Path) -> Result<PathBuf, TransformationError> {
        let backup_path = unique_backup_path(path);
        fs::copy(path, &backup_path).map_err(|source| TransformationError::Write {
            path: backup_path.clone(),
            source,
        })?;
        Ok(backup_path)
    }

    /// Apply every tenant edit, then every academic year edit, then validate.
    ///
    /// Only validation errors introduced by this run abort it; errors the
    /// targeted models already had are reported as warnings.
    pub fn transform(&self, document: &mut SchemaDocument) -> Result<TransformationResult, TransformationError> {
        let targets: Vec<&str> = self
            .config
            .tenant_models
            .iter()
            .chain(&self.config.year_scoped_models)
            .map(String::as_str)
            .collect();
        let baseline = validation::validate_models(document, &targets);

        let mut outcomes = Vec::new();
        for model in &self.config.tenant_models {
            outcomes.extend(self.add_tenant_scope(document, model));
        }
        for model in &self.config.year_scoped_models {
            outcomes.push(self.add_year_scope(document, model));
        }

        let warnings: Vec<TransformationWarning> =
            outcomes.iter().filter_map(TransformationWarning::from_outcome).collect();

        let mut validation_report = validation::validate_models(document, &targets);
        validation_report.demote_preexisting(&baseline);
        if validation_report.has_errors() {
            return Err(TransformationError::ValidationFailed(validation_report));
        }

        let references = self.relation_targets(&outcomes);
        validation::check_referenced_models(document, &references, &mut validation_report);

        Ok(TransformationResult {
            outcomes,
            warnings,
            validation_report,
        })
    }

    /// Add the tenant scalar and relation after the model's identifier, then
    /// index the scalar just before the model's `@@map`.
    pub fn add_tenant_scope(&self, document: &mut SchemaDocument, model_name: &str) -> Vec<StepOutcome> {
        let (fields, index) = match document.model_mut(model_name) {
            Some(model) => {
                let fields = self.insert_tenant_fields(model);
                let index = self.insert_tenant_index(model);
                (fields, index)
            }
            None => (
                StepStatus::Skipped(SkipReason::ModelNotFound),
                StepStatus::Skipped(SkipReason::ModelNotFound),
            ),
        };

        let outcomes = vec![
            StepOutcome::new(model_name, TransformationKind::TenantFields, fields),
            StepOutcome::new(model_name, TransformationKind::TenantIndex, index),
        ];
        outcomes.iter().for_each(log_outcome);
        outcomes
    }

    /// Replace the model's `academicYear String @default("...")` with an id
    /// field and a relation to the academic year model.
    pub fn add_year_scope(&self, document: &mut SchemaDocument, model_name: &str) -> StepOutcome {
        let status = match document.model_mut(model_name) {
            Some(model) => self.convert_year_field(model),
            None => StepStatus::Skipped(SkipReason::ModelNotFound),
        };

        let outcome = StepOutcome::new(model_name, TransformationKind::YearScope, status);
        log_outcome(&outcome);
        outcome
    }

    fn insert_tenant_fields(&self, model: &mut ModelBlock) -> StepStatus {
        let tenant = &self.config.tenant;

        match (model.has_field(&tenant.scalar_field), model.has_field(&tenant.relation_field)) {
            (true, true) => return StepStatus::AlreadyPresent,
            (true, false) => {
                return StepStatus::Skipped(SkipReason::FieldConflict {
                    field: tenant.scalar_field.clone(),
                })
            }
            (false, true) => {
                return StepStatus::Skipped(SkipReason::FieldConflict {
                    field: tenant.relation_field.clone(),
                })
            }
            (false, false) => {}
        }

        let Some(anchor) = model.identifier_position() else {
            return StepStatus::Skipped(SkipReason::AnchorNotFound {
                anchor: IDENTIFIER_ANCHOR.to_string(),
            });
        };

        let layout = model
            .layout_at(anchor)
            .aligned(&[tenant.scalar_field.as_str(), tenant.relation_field.as_str()]);
        let relation = format!(
            "{} @relation(fields: [{}], references: [id], onDelete: {})",
            tenant.model, tenant.scalar_field, tenant.on_delete
        );
        let lines = vec![
            layout.field_line(&tenant.scalar_field, "String"),
            layout.field_line(&tenant.relation_field, &relation),
        ];
        model.insert_lines(anchor + 1, lines);

        StepStatus::Applied
    }

    fn insert_tenant_index(&self, model: &mut ModelBlock) -> StepStatus {
        let scalar = &self.config.tenant.scalar_field;

        if !model.has_field(scalar) {
            return StepStatus::Skipped(SkipReason::TenantFieldMissing { field: scalar.clone() });
        }
        if has_single_field_index(model, scalar) {
            return StepStatus::AlreadyPresent;
        }
        let Some(mapping) = model.block_attribute_position("map") else {
            return StepStatus::Skipped(SkipReason::MappingAnnotationMissing);
        };

        let layout = model.layout_at(mapping);
        model.insert_lines(mapping, vec![layout.line(&format!("@@index([{}])", scalar))]);

        StepStatus::Applied
    }

    fn convert_year_field(&self, model: &mut ModelBlock) -> StepStatus {
        let year = &self.config.year_scope;

        if model.has_field(&year.id_field) {
            return StepStatus::AlreadyPresent;
        }

        let anchor = model.field_position(&year.field).and_then(|position| {
            let field = model.lines()[position].field()?;
            (field.field_type == "String" && field.fixed_string_default().is_some())
                .then(|| (position, field.attributes_without_default()))
        });
        let Some((position, carried)) = anchor else {
            return StepStatus::Skipped(SkipReason::AnchorNotFound {
                anchor: format!("{} String @default(\"...\")", year.field),
            });
        };

        // Column attributes such as @map and @db.* stay with the scalar
        let scalar = if carried.is_empty() {
            "String".to_string()
        } else {
            format!("String {}", carried)
        };
        let layout = model
            .layout_at(position)
            .aligned(&[year.id_field.as_str(), year.field.as_str()]);
        let relation = format!(
            "{} @relation(fields: [{}], references: [id])",
            year.model, year.id_field
        );
        model.replace_line(
            position,
            vec![
                layout.field_line(&year.id_field, &scalar),
                layout.field_line(&year.field, &relation),
            ],
        );
        model.rename_in_field_lists(&year.field, &year.id_field);

        StepStatus::Applied
    }

    /// `(model, referenced model)` for every relation this run introduced.
    fn relation_targets<'a>(&'a self, outcomes: &'a [StepOutcome]) -> Vec<(&'a str, &'a str)> {
        outcomes
            .iter()
            .filter(|outcome| outcome.is_applied())
            .filter_map(|outcome| match outcome.kind {
                TransformationKind::TenantFields => Some((outcome.model.as_str(), self.config.tenant.model.as_str())),
                TransformationKind::YearScope => Some((outcome.model.as_str(), self.config.year_scope.model.as_str())),
                TransformationKind::TenantIndex => None,
            })
            .collect()
    }
}

impl TransformationResult {
    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_applied()).count()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Models that received the given edit in this run
    pub fn applied_models(&self, kind: TransformationKind) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.kind == kind && outcome.is_applied())
            .map(|outcome| outcome.model.as_str())
            .collect()
    }
}

impl TransformationWarning {
    pub fn from_outcome(outcome: &StepOutcome) -> Option<Self> {
        let reason = outcome.skip_reason()?;
        let warning_type = match reason {
            SkipReason::ModelNotFound => TransformationWarningType::ModelNotFound,
            SkipReason::AnchorNotFound { .. } => TransformationWarningType::AnchorNotFound,
            SkipReason::FieldConflict { .. } => TransformationWarningType::FieldConflict,
            SkipReason::MappingAnnotationMissing | SkipReason::TenantFieldMissing { .. } => {
                TransformationWarningType::IndexNotInserted
            }
        };

        Some(Self {
            message: format!("{}: {} skipped ({})", outcome.model, outcome.kind, reason),
            model: outcome.model.clone(),
            kind: outcome.kind,
            warning_type,
        })
    }
}

fn has_single_field_index(model: &ModelBlock, field: &str) -> bool {
    let expected = format!("@@index([{}]", field);
    model.block_attributes("index").any(|attribute| {
        let compact: String = attribute.chars().filter(|c| !c.is_whitespace()).collect();
        compact.replace("fields:", "").starts_with(&expected)
    })
}

fn unique_backup_path(path: &Path) -> PathBuf {
    let base = format!("{}.bak", path.display());
    let mut candidate = PathBuf::from(&base);
    let mut count = 0;

    while candidate.exists() {
        count += 1;
        candidate = PathBuf::from(format!("{}-{}", base, count));
    }

    candidate
}

fn log_outcome(outcome: &StepOutcome) {
    match &outcome.status {
        StepStatus::Applied => info!(model = %outcome.model, kind = %outcome.kind, "applied"),
        StepStatus::AlreadyPresent => debug!(model = %outcome.model, kind = %outcome.kind, "already present"),
        StepStatus::Skipped(reason) => {
            warn!(model = %outcome.model, kind = %outcome.kind, %reason, "skipped")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ValidationErrorType, ValidationWarningType};

    const SCHEMA: &str = r#"datasource db {
  provider = "postgresql"
  url      = env("DATABASE_URL")
}

model School {
  id   String @id @default(cuid())
  name String

  @@map("schools")
}

model Student {
  id        String   @id @default(cuid())
  firstName String
  createdAt DateTime @default(now())

  @@map("students")
}

model Teacher {
  id        String   @id @default(cuid())
  firstName String
}

model Class {
  id           String @id @default(uuid())
  name         String
  academicYear String @default("2024-2025")

  @@map("classes")
}

model AcademicYear {
  id   String @id @default(cuid())
  name String
}
"#;

    fn config(tenant: &[&str], year: &[&str]) -> MigrationConfig {
        MigrationConfig {
            tenant_models: tenant.iter().map(|s| s.to_string()).collect(),
            year_scoped_models: year.iter().map(|s| s.to_string()).collect(),
            ..MigrationConfig::default()
        }
    }

    fn model_text(document: &SchemaDocument, name: &str) -> String {
        document.model(name).unwrap().to_string()
    }

    #[test]
    fn test_single_student_end_to_end() {
        let mut document: SchemaDocument = "model Student {\n  id String @id @default(cuid())\n\n  @@map(\"students\")\n}\n"
            .parse()
            .unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &[]));

        let result = transformer.transform(&mut document).unwrap();

        assert_eq!(
            document.to_string(),
            "model Student {\n  id String @id @default(cuid())\n  tenantId String\n  tenant   School @relation(fields: [tenantId], references: [id], onDelete: Cascade)\n\n  @@index([tenantId])\n  @@map(\"students\")\n}\n"
        );
        assert_eq!(result.applied_count(), 2);
        assert!(!result.has_warnings());
        assert!(!document.to_string().contains("academicYear"));
    }

    #[test]
    fn test_tenant_fields_follow_identifier_line() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &[]));

        transformer.add_tenant_scope(&mut document, "Student");

        let student = document.model("Student").unwrap();
        let names: Vec<&str> = student.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "tenantId", "tenant", "firstName", "createdAt"]);
        assert_eq!(student.lines()[1].raw(), "  tenantId  String\n");
        assert_eq!(
            student.lines()[2].raw(),
            "  tenant    School @relation(fields: [tenantId], references: [id], onDelete: Cascade)\n"
        );
    }

    #[test]
    fn test_index_sits_immediately_before_mapping() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &[]));

        transformer.add_tenant_scope(&mut document, "Student");

        let student = document.model("Student").unwrap();
        let mapping = student.block_attribute_position("map").unwrap();
        assert_eq!(student.lines()[mapping - 1].content(), "  @@index([tenantId])");
    }

    #[test]
    fn test_missing_mapping_reports_index_skip() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Teacher"], &[]));

        let outcomes = transformer.add_tenant_scope(&mut document, "Teacher");

        assert!(outcomes[0].is_applied());
        assert_eq!(outcomes[1].skip_reason(), Some(&SkipReason::MappingAnnotationMissing));
        assert_eq!(document.model("Teacher").unwrap().block_attributes("index").count(), 0);
    }

    #[test]
    fn test_scoping_leaves_identical_models_untouched() {
        let original: SchemaDocument = SCHEMA.parse().unwrap();
        let mut document = original.clone();
        let transformer = SchemaTransformer::new(config(&["Teacher"], &[]));

        transformer.transform(&mut document).unwrap();

        for name in ["School", "Student", "Class", "AcademicYear"] {
            assert_eq!(model_text(&document, name), model_text(&original, name));
        }
        assert_ne!(model_text(&document, "Teacher"), model_text(&original, "Teacher"));
        assert!(document.to_string().starts_with("datasource db {\n"));
    }

    #[test]
    fn test_year_scope_conversion() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&[], &["Class"]));

        let outcome = transformer.add_year_scope(&mut document, "Class");

        assert!(outcome.is_applied());
        let class = document.model("Class").unwrap();
        assert_eq!(class.field("academicYearId").unwrap().field_type, "String");
        assert_eq!(class.field("academicYear").unwrap().field_type, "AcademicYear");
        assert!(!class.to_string().contains("@default(\"2024-2025\")"));
        assert!(class.to_string().contains(
            "  academicYear   AcademicYear @relation(fields: [academicYearId], references: [id])\n"
        ));
    }

    #[test]
    fn test_year_scope_keeps_column_attributes_and_rewrites_field_lists() {
        let mut document: SchemaDocument = r#"model Class {
  id           String @id @default(cuid())
  name         String
  academicYear String @default("2024-2025") @map("academic_year") @db.VarChar(32)

  @@unique([name, academicYear])
  @@index([academicYear(sort: Desc)])
  @@map("classes")
}

model AcademicYear {
  id String @id @default(cuid())
}
"#
        .parse()
        .unwrap();
        let transformer = SchemaTransformer::new(config(&[], &["Class"]));

        let result = transformer.transform(&mut document).unwrap();

        assert!(result.validation_report.is_valid);
        assert_eq!(
            model_text(&document, "Class"),
            r#"model Class {
  id           String @id @default(cuid())
  name         String
  academicYearId String @map("academic_year") @db.VarChar(32)
  academicYear   AcademicYear @relation(fields: [academicYearId], references: [id])

  @@unique([name, academicYearId])
  @@index([academicYearId(sort: Desc)])
  @@map("classes")
}
"#
        );
    }

    #[test]
    fn test_relation_listed_in_index_fails_validation() {
        let mut document: SchemaDocument = "model Student {\n  id String @id @default(cuid())\n\n  @@index([tenant])\n  @@map(\"students\")\n}\n\nmodel School {\n  id String @id @default(cuid())\n}\n"
            .parse()
            .unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &[]));

        let report = match transformer.transform(&mut document) {
            Err(TransformationError::ValidationFailed(report)) => report,
            other => panic!("expected a validation failure, got {:?}", other),
        };
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].error_type, ValidationErrorType::RelationFieldInIndex);
    }

    #[test]
    fn test_preexisting_errors_do_not_block_the_batch() {
        let mut document: SchemaDocument = SCHEMA
            .replace("  firstName String\n  createdAt", "  firstName String\n  firstName String\n  createdAt")
            .parse()
            .unwrap();
        let transformer = SchemaTransformer::new(config(&["Student", "Class"], &[]));

        let result = transformer.transform(&mut document).unwrap();

        assert_eq!(
            result.applied_models(TransformationKind::TenantFields),
            vec!["Student", "Class"]
        );
        assert!(result.validation_report.is_valid);
        assert!(result
            .validation_report
            .warnings
            .iter()
            .any(|w| w.model == "Student" && w.warning_type == ValidationWarningType::PreexistingError));
    }

    #[test]
    fn test_crlf_model_gets_crlf_insertions() {
        let mut document: SchemaDocument =
            "model Student {\r\n  id String @id @default(cuid())\r\n  academicYear String @default(\"2024\")\r\n\r\n  @@map(\"students\")\r\n}\r\n"
                .parse()
                .unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &["Student"]));

        let result = transformer.transform(&mut document).unwrap();
        assert_eq!(result.applied_count(), 3);

        let text = document.to_string();
        assert!(!text.replace("\r\n", "").contains('\n'), "bare LF in {:?}", text);
        assert!(text.contains("  tenantId String\r\n"));
        assert!(text.contains("  @@index([tenantId])\r\n  @@map(\"students\")\r\n"));
        assert!(text.contains("  academicYearId String\r\n"));
    }

    #[test]
    fn test_year_scope_without_default_is_skipped() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&[], &["Student"]));

        let outcome = transformer.add_year_scope(&mut document, "Student");

        assert!(matches!(
            outcome.skip_reason(),
            Some(SkipReason::AnchorNotFound { .. })
        ));
        assert_eq!(document.to_string(), SCHEMA);
    }

    #[test]
    fn test_full_run_is_idempotent() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Student", "Class", "Teacher"], &["Class"]));

        transformer.transform(&mut document).unwrap();
        let once = document.to_string();
        let second = transformer.transform(&mut document).unwrap();

        assert_eq!(document.to_string(), once);
        assert_eq!(second.applied_count(), 0);
        assert!(second
            .outcomes
            .iter()
            .filter(|o| o.model != "Teacher" || o.kind != TransformationKind::TenantIndex)
            .all(|o| o.status == StepStatus::AlreadyPresent));
    }

    #[test]
    fn test_tenant_and_year_edits_do_not_clobber_each_other() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Class"], &["Class"]));

        transformer.transform(&mut document).unwrap();

        let class = document.model("Class").unwrap();
        let names: Vec<&str> = class.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "tenantId", "tenant", "name", "academicYearId", "academicYear"]
        );
    }

    #[test]
    fn test_unknown_model_is_a_warning_not_an_error() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Ghost", "Student"], &["Phantom"]));

        let result = transformer.transform(&mut document).unwrap();

        assert_eq!(result.applied_models(TransformationKind::TenantFields), vec!["Student"]);
        assert_eq!(result.warnings.len(), 3);
        assert!(result
            .warnings
            .iter()
            .all(|w| w.warning_type == TransformationWarningType::ModelNotFound));
    }

    #[test]
    fn test_half_migrated_model_is_a_conflict() {
        let mut document: SchemaDocument =
            "model Student {\n  id String @id @default(cuid())\n  tenantId String\n}\n".parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &[]));

        let outcomes = transformer.add_tenant_scope(&mut document, "Student");

        assert_eq!(
            outcomes[0].skip_reason(),
            Some(&SkipReason::FieldConflict {
                field: "tenantId".to_string()
            })
        );
        assert_eq!(document.model("Student").unwrap().fields().count(), 2);
    }

    #[test]
    fn test_existing_index_is_detected_with_other_spacing() {
        let mut document: SchemaDocument = "model Student {\n  id String @id @default(cuid())\n  tenantId String\n  tenant School @relation(fields: [tenantId], references: [id])\n  @@index(fields: [ tenantId ])\n  @@map(\"students\")\n}\n"
            .parse()
            .unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &[]));

        let outcomes = transformer.add_tenant_scope(&mut document, "Student");

        assert_eq!(outcomes[0].status, StepStatus::AlreadyPresent);
        assert_eq!(outcomes[1].status, StepStatus::AlreadyPresent);
    }

    #[test]
    fn test_missing_relation_target_is_reported() {
        let mut document: SchemaDocument = "model Student {\n  id String @id @default(cuid())\n}\n".parse().unwrap();
        let transformer = SchemaTransformer::new(config(&["Student"], &[]));

        let result = transformer.transform(&mut document).unwrap();

        assert!(result.validation_report.is_valid);
        assert_eq!(result.validation_report.warnings.len(), 1);
        assert_eq!(result.validation_report.warnings[0].model, "Student");
    }

    #[test]
    fn test_custom_field_names() {
        let mut document: SchemaDocument = SCHEMA.parse().unwrap();
        let mut config = config(&["Student"], &[]);
        config.tenant.scalar_field = "schoolId".to_string();
        config.tenant.relation_field = "school".to_string();
        let transformer = SchemaTransformer::new(config);

        transformer.transform(&mut document).unwrap();

        let student = document.model("Student").unwrap();
        assert!(student.has_field("schoolId"));
        assert!(student.has_field("school"));
        assert_eq!(student.block_attributes("index").collect::<Vec<_>>(), vec!["@@index([schoolId])"]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.prisma");
        fs::write(&path, SCHEMA).unwrap();

        let mut document = SchemaTransformer::load(&path).unwrap();
        SchemaTransformer::new(config(&["Student"], &[]))
            .transform(&mut document)
            .unwrap();
        SchemaTransformer::save(&document, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, document.to_string());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SchemaTransformer::load(&dir.path().join("missing.prisma"));
        assert!(matches!(result, Err(TransformationError::Read { .. })));
    }

    #[test]
    fn test_save_into_missing_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("schema.prisma");
        let document: SchemaDocument = SCHEMA.parse().unwrap();

        let result = SchemaTransformer::save(&document, &path);

        assert!(matches!(result, Err(TransformationError::Write { path: ref p, .. }) if *p == path));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_backup_picks_unused_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.prisma");
        fs::write(&path, SCHEMA).unwrap();

        let first = SchemaTransformer::backup(&path).unwrap();
        let second = SchemaTransformer::backup(&path).unwrap();

        assert_eq!(first, dir.path().join("schema.prisma.bak"));
        assert_eq!(second, dir.path().join("schema.prisma.bak-1"));
        assert_eq!(fs::read_to_string(second).unwrap(), SCHEMA);
    }

    #[test]
    fn test_transformation_warning_from_outcome() {
        let outcome = StepOutcome::new(
            "Teacher",
            TransformationKind::TenantIndex,
            StepStatus::Skipped(SkipReason::MappingAnnotationMissing),
        );

        let warning = TransformationWarning::from_outcome(&outcome).unwrap();
        assert_eq!(warning.warning_type, TransformationWarningType::IndexNotInserted);
        assert_eq!(
            warning.message,
            "Teacher: tenant index skipped (no @@map annotation to anchor the index)"
        );

        let applied = StepOutcome::new("Teacher", TransformationKind::TenantFields, StepStatus::Applied);
        assert!(TransformationWarning::from_outcome(&applied).is_none());
    }
}
