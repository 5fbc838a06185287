use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::transformation_engine::TransformationError;

/// The two ordered model lists plus the names used for the inserted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Models that receive the tenant scalar, the tenant relation and the tenant index
    pub tenant_models: Vec<String>,
    /// Models whose hardcoded academic year string becomes a relation
    pub year_scoped_models: Vec<String>,
    pub tenant: TenantSettings,
    pub year_scope: YearScopeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantSettings {
    pub scalar_field: String,
    pub relation_field: String,
    /// Model that owns tenant-scoped records
    pub model: String,
    pub on_delete: ReferentialAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YearScopeSettings {
    /// Name of the defaulted string field; reused for the relation field
    pub field: String,
    pub id_field: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    NoAction,
    SetNull,
    SetDefault,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferentialAction::Cascade => "Cascade",
            ReferentialAction::Restrict => "Restrict",
            ReferentialAction::NoAction => "NoAction",
            ReferentialAction::SetNull => "SetNull",
            ReferentialAction::SetDefault => "SetDefault",
        };
        f.write_str(name)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let names = |list: &[&str]| -> Vec<String> { list.iter().map(|name| name.to_string()).collect() };
        Self {
            tenant_models: names(&[
                "User",
                "Student",
                "Teacher",
                "Parent",
                "Class",
                "Subject",
                "Grade",
                "Attendance",
                "AcademicYear",
            ]),
            year_scoped_models: names(&["Class", "StudentMonthlySummary"]),
            tenant: TenantSettings::default(),
            year_scope: YearScopeSettings::default(),
        }
    }
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            scalar_field: "tenantId".to_string(),
            relation_field: "tenant".to_string(),
            model: "School".to_string(),
            on_delete: ReferentialAction::Cascade,
        }
    }
}

impl Default for YearScopeSettings {
    fn default() -> Self {
        Self {
            field: "academicYear".to_string(),
            id_field: "academicYearId".to_string(),
            model: "AcademicYear".to_string(),
        }
    }
}

impl MigrationConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Read a YAML configuration file; missing keys fall back to the defaults.
    pub fn load(path: &Path) -> Result<Self, TransformationError> {
        let text = fs::read_to_string(path).map_err(|source| TransformationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|source| TransformationError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The kinds of edit applied to a model block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationKind {
    TenantFields,
    TenantIndex,
    YearScope,
}

impl fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransformationKind::TenantFields => "tenant fields",
            TransformationKind::TenantIndex => "tenant index",
            TransformationKind::YearScope => "academic year relation",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Applied,
    AlreadyPresent,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ModelNotFound,
    AnchorNotFound { anchor: String },
    FieldConflict { field: String },
    MappingAnnotationMissing,
    TenantFieldMissing { field: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ModelNotFound => write!(f, "model not found"),
            SkipReason::AnchorNotFound { anchor } => write!(f, "no `{}` declaration found", anchor),
            SkipReason::FieldConflict { field } => {
                write!(f, "field `{}` already exists without its counterpart", field)
            }
            SkipReason::MappingAnnotationMissing => write!(f, "no @@map annotation to anchor the index"),
            SkipReason::TenantFieldMissing { field } => write!(f, "field `{}` is not present", field),
        }
    }
}

/// What happened to one model for one kind of edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub model: String,
    pub kind: TransformationKind,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn new(model: &str, kind: TransformationKind, status: StepStatus) -> Self {
        Self {
            model: model.to_string(),
            kind,
            status,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.status == StepStatus::Applied
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.status {
            StepStatus::Skipped(reason) => Some(reason),
            _ => None,
        }
    }
}
