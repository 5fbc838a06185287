// Prisma schema multi-tenancy migration
pub mod schema_document;
pub mod transformation_rule;
pub mod validation;
pub mod transformation_engine;
pub mod reporter;

// Re-export core types for convenience
pub use schema_document::{ModelBlock, ParseError, SchemaDocument};
pub use transformation_rule::{MigrationConfig, SkipReason, StepOutcome, StepStatus, TransformationKind};
pub use validation::{ValidationReport, ValidationError, ValidationWarning};
pub use transformation_engine::{SchemaTransformer, TransformationError, TransformationResult, TransformationWarning};
pub use reporter::{ReportFormat, TransformationReporter, TransformationReport};
