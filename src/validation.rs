use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::schema_document::{ModelBlock, SchemaDocument, FIELD_LIST_ATTRIBUTES};

/// Structural checks run over the rewritten models before anything is saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Move errors that `baseline` already had to the warnings, so that only
    /// problems introduced since the baseline remain errors.
    pub fn demote_preexisting(&mut self, baseline: &ValidationReport) {
        let (preexisting, introduced): (Vec<_>, Vec<_>) = std::mem::take(&mut self.errors)
            .into_iter()
            .partition(|error| baseline.errors.contains(error));

        for error in preexisting {
            self.add_warning(ValidationWarning::new(
                &error.model,
                ValidationWarningType::PreexistingError,
                error.message,
            ));
        }
        self.is_valid = introduced.is_empty();
        self.errors = introduced;
    }

    /// One line naming every error, for error messages.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|error| format!("{}: {}", error.model, error.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub model: String,
    pub error_type: ValidationErrorType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationErrorType {
    DuplicateField,
    UnknownIndexField,
    UnknownRelationField,
    /// `@@index`, `@@unique` or `@@id` names a field whose type is a model
    RelationFieldInIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub model: String,
    pub warning_type: ValidationWarningType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationWarningType {
    /// A relation points at a model this document does not declare
    ReferencedModelMissing,
    /// An error that was already in the schema before this run
    PreexistingError,
}

impl ValidationError {
    pub fn new(model: &str, error_type: ValidationErrorType, message: String) -> Self {
        Self {
            model: model.to_string(),
            error_type,
            message,
        }
    }
}

impl ValidationWarning {
    pub fn new(model: &str, warning_type: ValidationWarningType, message: String) -> Self {
        Self {
            model: model.to_string(),
            warning_type,
            message,
        }
    }
}

fn field_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]").expect("field list pattern is valid"))
}

fn relation_fields_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@relation\([^)]*fields:\s*\[([^\]]*)\]").expect("relation pattern is valid")
    })
}

/// Names in a `[a, b(sort: Desc)]` list, without their arguments.
fn list_names(list: &str) -> Vec<&str> {
    list.split(',')
        .map(|entry| entry.split('(').next().unwrap_or("").trim())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Validate the named models of `document`.
///
/// Only the listed models are checked so that problems already present in
/// unrelated parts of the schema never block a run.
pub fn validate_models(document: &SchemaDocument, models: &[&str]) -> ValidationReport {
    let mut report = ValidationReport::new();
    let mut checked = HashSet::new();
    let declared: HashSet<&str> = document.model_names().into_iter().collect();

    for name in models {
        if !checked.insert(*name) {
            continue;
        }
        if let Some(model) = document.model(name) {
            check_model(model, &declared, &mut report);
        }
    }

    report
}

/// Warn for each `(model, referenced)` pair whose referenced model is not declared.
pub fn check_referenced_models(
    document: &SchemaDocument,
    references: &[(&str, &str)],
    report: &mut ValidationReport,
) {
    let declared: HashSet<&str> = document.model_names().into_iter().collect();
    for (model, referenced) in references {
        if !declared.contains(referenced) {
            report.add_warning(ValidationWarning::new(
                model,
                ValidationWarningType::ReferencedModelMissing,
                format!("relation target `{}` is not declared in this schema", referenced),
            ));
        }
    }
}

fn check_model(model: &ModelBlock, declared: &HashSet<&str>, report: &mut ValidationReport) {
    let mut names = HashSet::new();
    for field in model.fields() {
        if !names.insert(field.name.as_str()) {
            report.add_error(ValidationError::new(
                model.name(),
                ValidationErrorType::DuplicateField,
                format!("field `{}` is declared more than once", field.name),
            ));
        }
    }

    for kind in FIELD_LIST_ATTRIBUTES {
        for attribute in model.block_attributes(kind) {
            check_field_list(model, attribute, declared, report);
        }
    }

    for field in model.fields() {
        let Some(caps) = relation_fields_regex().captures(&field.attributes) else {
            continue;
        };
        for name in list_names(&caps[1]) {
            if !names.contains(name) {
                report.add_error(ValidationError::new(
                    model.name(),
                    ValidationErrorType::UnknownRelationField,
                    format!("relation `{}` uses unknown field `{}`", field.name, name),
                ));
            }
        }
    }
}

/// Every name in a block attribute's field list must be a scalar field of the model.
fn check_field_list(model: &ModelBlock, attribute: &str, declared: &HashSet<&str>, report: &mut ValidationReport) {
    let Some(caps) = field_list_regex().captures(attribute) else {
        return;
    };
    for name in list_names(&caps[1]) {
        match model.field(name) {
            None => report.add_error(ValidationError::new(
                model.name(),
                ValidationErrorType::UnknownIndexField,
                format!("`{}` references unknown field `{}`", attribute, name),
            )),
            Some(field) if field.has_attribute("@relation") || declared.contains(field.base_type()) => {
                report.add_error(ValidationError::new(
                    model.name(),
                    ValidationErrorType::RelationFieldInIndex,
                    format!("`{}` lists relation field `{}`", attribute, name),
                ))
            }
            Some(_) => {}
        }
    }
}
