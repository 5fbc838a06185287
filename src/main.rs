use clap::Parser;
use prisma_tenancy_upgrade::{
    MigrationConfig, ReportFormat, SchemaTransformer, TransformationError, TransformationReporter,
};
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit code used when `--strict` finds configured steps that were skipped
const STRICT_FAILURE_EXIT_CODE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "prisma-tenancy-upgrade")]
#[command(about = "Add tenant scoping and academic year relations to a Prisma schema")]
struct Args {
    /// Path to the Prisma schema to rewrite in place
    #[arg(default_value = "schema.prisma")]
    schema_file: PathBuf,

    /// YAML file overriding the model lists and inserted field names
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the transformed schema to stdout instead of writing it
    #[arg(long)]
    dry_run: bool,

    /// Copy the schema to <SCHEMA_FILE>.bak before overwriting it
    #[arg(long)]
    backup: bool,

    /// Fail without writing if any configured model could not be migrated
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report_format: ReportFormat,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<i32, TransformationError> {
    let config = match &args.config {
        Some(path) => MigrationConfig::load(path)?,
        None => MigrationConfig::default(),
    };
    let transformer = SchemaTransformer::new(config);

    // Everything is built in memory before the file is touched
    let mut document = SchemaTransformer::load(&args.schema_file)?;
    let result = transformer.transform(&mut document)?;

    let blocked = args.strict && result.has_warnings();
    let write = !args.dry_run && !blocked && result.applied_count() > 0;

    let mut backup_path = None;
    if write {
        if args.backup {
            let path = SchemaTransformer::backup(&args.schema_file)?;
            info!(backup = %path.display(), "backup written");
            backup_path = Some(path.display().to_string());
        }
        SchemaTransformer::save(&document, &args.schema_file)?;
        info!(path = %args.schema_file.display(), "schema written");
    }

    let reporter = TransformationReporter::new().with_format(args.report_format);
    let mut report = reporter.generate_report(&args.schema_file.display().to_string(), write, &result);
    report.backup_path = backup_path;
    let rendered = reporter.format_report(&report)?;

    if args.dry_run {
        print!("{}", document);
        eprint!("{}", rendered);
    } else {
        print!("{}", rendered);
    }

    if blocked {
        eprintln!(
            "\n❌ --strict: {} configured step(s) were skipped; {} was left unchanged",
            result.warnings.len(),
            args.schema_file.display()
        );
        return Ok(STRICT_FAILURE_EXIT_CODE);
    }

    Ok(0)
}
