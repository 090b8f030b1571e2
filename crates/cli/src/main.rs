// lcigrid CLI - hybrid IO table import, LCI matrix export and matching reports

mod exit_codes;
mod export;
mod ilcd;
mod import;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lcigrid_config::{Settings, SettingsError};
use lcigrid_io::{ExportError, IlcdError, LoadError};
use lcigrid_recon::{MigrationError, ReconError, SourceError};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

fn long_version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")")
}

#[derive(Parser)]
#[command(name = "lcigrid")]
#[command(about = "Reconcile hybrid IO tables into canonical exchanges and export LCI matrices")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/lcigrid/settings.toml)
    #[arg(long, global = true, env = "LCIGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (overridden by LCIGRID_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a hybrid IO datapackage as datasets plus canonical exchanges
    #[command(after_help = "\
Writes datasets.json (metadata store), exchanges.jsonl (one exchange per line)
and import.json (run metadata and reconciliation counts) to the output directory.

Examples:
  lcigrid import exio.import.toml
  lcigrid import --source data/exiobase --registry biosphere3.json
  lcigrid import exio.import.toml --db-name 'EXIOBASE 3.8 hybrid' -o out/
  lcigrid import exio.import.toml --json | jq .summary")]
    Import {
        /// Import config (.import.toml). Flags override its values.
        config_file: Option<PathBuf>,

        /// Datapackage directory
        #[arg(long)]
        source: Option<PathBuf>,

        /// Canonical flow list (JSON)
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Namespace of the canonical flow list
        #[arg(long)]
        namespace: Option<String>,

        /// Name of the database to create
        #[arg(long)]
        db_name: Option<String>,

        /// Migration rule set identifier
        #[arg(long)]
        migration: Option<String>,

        /// Directory of stored migration rule sets
        #[arg(long)]
        migrations_dir: Option<PathBuf>,

        /// Output directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print import.json to stdout
        #[arg(long)]
        json: bool,
    },

    /// Export technosphere and biosphere matrices of a database to Excel
    #[command(after_help = "\
Examples:
  lcigrid export lci.json --store datasets.json --database 'EXIOBASE 3.3.17 hybrid'
  lcigrid export lci.json --store datasets.json --database ei --include-descendants
  lcigrid export lci.json --store datasets.json --database ei -o exports/ --json")]
    Export {
        /// LCI bundle (index dicts plus sparse matrices, JSON)
        bundle: PathBuf,

        /// Metadata store (JSON)
        #[arg(long)]
        store: PathBuf,

        /// Database to export
        #[arg(long)]
        database: String,

        /// Keep upstream activities as matrix columns
        #[arg(long)]
        include_descendants: bool,

        /// Output directory (default: settings export dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the export report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List the activities of a database in a workbook
    #[command(after_help = "\
Examples:
  lcigrid activities --store datasets.json --database ei
  lcigrid activities --store datasets.json --database ei -o reports/")]
    Activities {
        /// Metadata store (JSON)
        #[arg(long)]
        store: PathBuf,

        /// Database to list
        #[arg(long)]
        database: String,

        /// Output directory (default: settings export dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write a database linking report from matching records
    #[command(after_help = "\
Input is a JSON array of datasets, each with its exchanges and an optional
`input` key for exchanges that were linked.

Examples:
  lcigrid match-report matching.json --name ecoinvent-3.6")]
    MatchReport {
        /// Matching records (JSON)
        input: PathBuf,

        /// Name used in the workbook filename
        #[arg(long)]
        name: String,

        /// Output directory (default: settings export dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write an impact method linking report
    #[command(after_help = "\
Input is a JSON array of methods: {\"name\": [...], \"exchanges\": [...]}.

Examples:
  lcigrid lcia-report methods.json --name 'ReCiPe 2016'")]
    LciaReport {
        /// Method records (JSON)
        input: PathBuf,

        /// Name used in the workbook filename
        #[arg(long)]
        name: String,

        /// Output directory (default: settings export dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Extract elementary flows from an ILCD zip archive
    #[command(after_help = "\
Examples:
  lcigrid ilcd EF-v3.0.zip
  lcigrid ilcd EF-v3.0.zip -o flows.json")]
    Ilcd {
        /// ILCD archive
        archive: PathBuf,

        /// Write JSON to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List stored migration rule sets
    Migrations {
        /// Rule set directory (default: settings migrations dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "lcigrid=debug" } else { "lcigrid=info" };
    let filter = EnvFilter::try_from_env("LCIGRID_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Settings::load_from(path).map_err(CliError::settings),
        None => Ok(Settings::load()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_settings(cli.config.as_ref()).and_then(|settings| run(cli.command, &settings));

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands, settings: &Settings) -> Result<(), CliError> {
    match command {
        Commands::Import {
            config_file,
            source,
            registry,
            namespace,
            db_name,
            migration,
            migrations_dir,
            output,
            json,
        } => import::cmd_import(
            settings,
            import::ImportArgs {
                config_file,
                source,
                registry,
                namespace,
                db_name,
                migration,
                migrations_dir,
                output,
            },
            json,
        ),
        Commands::Export { bundle, store, database, include_descendants, output, json } => {
            export::cmd_export(settings, bundle, store, database, include_descendants, output, json)
        }
        Commands::Activities { store, database, output } => {
            export::cmd_activities(settings, store, database, output)
        }
        Commands::MatchReport { input, name, output } => {
            export::cmd_match_report(settings, input, name, output)
        }
        Commands::LciaReport { input, name, output } => {
            export::cmd_lcia_report(settings, input, name, output)
        }
        Commands::Ilcd { archive, output } => ilcd::cmd_ilcd(archive, output),
        Commands::Migrations { dir } => import::cmd_migrations(settings, dir),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn settings(err: SettingsError) -> Self {
        Self::new(EXIT_USAGE, err.to_string())
            .with_hint("fix or remove the settings file, or pass --config")
    }

    pub fn source(err: SourceError) -> Self {
        let hint = match &err {
            SourceError::MissingResource(_) => {
                Some("check the resource list in datapackage.json".to_string())
            }
            _ => None,
        };
        Self { code: exit_codes::source_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        Self::new(exit_codes::recon_exit_code(&err), err.to_string())
    }

    pub fn migration(err: MigrationError) -> Self {
        let hint = match &err {
            MigrationError::NotFound(_) => {
                Some("run `lcigrid migrations` to list stored rule sets".to_string())
            }
            _ => None,
        };
        Self { code: exit_codes::migration_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn load(err: LoadError) -> Self {
        Self::new(exit_codes::load_exit_code(&err), err.to_string())
    }

    pub fn export(err: ExportError) -> Self {
        let hint = match &err {
            ExportError::DatabaseNotFound(_) => {
                Some("database names are the top-level keys of the store's \"databases\"".to_string())
            }
            _ => None,
        };
        Self { code: exit_codes::export_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn ilcd(err: IlcdError) -> Self {
        Self::new(exit_codes::ilcd_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
