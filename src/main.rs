use asana_migrate::app::{self, AppConfig};
use asana_migrate::concurrency::Concurrency;
use asana_migrate::config::MigrateConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Export Asana workspaces to disk and import tasks into Fauna
#[derive(Parser)]
#[command(name = "asana-migrate", version)]
#[command(about = "Export Asana projects, tasks and attachments, and import tasks into Fauna", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file (default: ./asana-migrate.toml if present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every project of a workspace to local files
    Export {
        /// Workspace gid (overrides ASANA_WORKSPACE)
        #[arg(short, long)]
        workspace: Option<String>,

        /// Directory to write the export to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Projects exported at once
        #[arg(long)]
        project_concurrency: Option<Concurrency>,

        /// Tasks exported at once within a project
        #[arg(long)]
        task_concurrency: Option<Concurrency>,

        /// Attachments downloaded at once within a task
        #[arg(long)]
        attachment_concurrency: Option<Concurrency>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Import exported task lists into a Fauna collection
    Import {
        /// Directory containing exported task list files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Target collection
        #[arg(long)]
        collection: Option<String>,

        /// Records created at once
        #[arg(long)]
        concurrency: Option<Concurrency>,

        /// Also read task files in subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
}

impl Commands {
    /// Apply command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut MigrateConfig) {
        match self {
            Commands::Export {
                workspace,
                output,
                project_concurrency,
                task_concurrency,
                attachment_concurrency,
                no_progress,
            } => {
                if let Some(workspace) = workspace {
                    config.asana.workspace = Some(workspace.clone());
                }
                if let Some(output) = output {
                    config.export.output_dir = output.clone();
                }
                if let Some(n) = project_concurrency {
                    config.export.project_concurrency = *n;
                }
                if let Some(n) = task_concurrency {
                    config.export.task_concurrency = *n;
                }
                if let Some(n) = attachment_concurrency {
                    config.export.attachment_concurrency = *n;
                }
                if *no_progress {
                    config.export.show_progress = false;
                }
            }
            Commands::Import {
                data_dir,
                collection,
                concurrency,
                recursive,
            } => {
                if let Some(data_dir) = data_dir {
                    config.import.data_dir = data_dir.clone();
                }
                if let Some(collection) = collection {
                    config.import.collection = collection.clone();
                }
                if let Some(n) = concurrency {
                    config.import.concurrency = *n;
                }
                if *recursive {
                    config.import.recursive = true;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = run(cli).await {
        app::handle_fatal_error(e, verbose);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let app_config = AppConfig::new(cli.verbose)?.with_config_file(cli.config);
    app::initialize_app(&app_config);

    // CLI paths are relative to the working directory, same as config paths
    let mut config = app::load_config(&app_config).await?;
    cli.command.apply_overrides(&mut config);
    debug!("Configuration after CLI overrides: {:?}", config);

    match cli.command {
        Commands::Export { .. } => {
            let output_dir = config.export.output_dir.clone();
            let summary = app::run_export(config).await?;
            println!(
                "Exported {} projects, {} tasks, {} attachments to {}",
                summary.projects,
                summary.tasks,
                summary.attachments_downloaded,
                output_dir.display()
            );
            if !summary.is_complete() {
                for failed in &summary.failed_projects {
                    eprintln!("  failed: {} ({}): {}", failed.name, failed.gid, failed.error);
                }
            }
        }
        Commands::Import { .. } => {
            let summary = app::run_import(config).await?;
            println!(
                "Imported {} records from {} files ({} skipped)",
                summary.records, summary.files, summary.skipped_files
            );
        }
    }

    Ok(())
}
