mod query;
mod watch;

use clap::{Args, Parser, Subcommand};
use lynkui_core::ServiceConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lynkui",
    version,
    about = "Live-reloading widget and data layer for lynkui projects",
    long_about = "Loads the widgets and templates of a project directory into memory, keeps them \
                  in sync with edits on disk, and routes widget data queries onto the data \
                  instances registered in the project's data layout."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct ProjectArgs {
    /// Path to the project root directory
    #[arg(value_name = "PROJECT_PATH")]
    pub path: PathBuf,

    /// TOML service config; flags given on the command line override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ProjectArgs {
    fn service_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(file) => ServiceConfig::from_file(file)?,
            None => ServiceConfig::default(),
        };
        config.app_project_path = self.path.clone();
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a project and keep it in sync with file changes
    #[command(
        long_about = "Loads every widget, template and project file, then watches the project \
                            directory (and the standard assets directory in dev mode) until Ctrl+C."
    )]
    Watch {
        #[command(flatten)]
        project: ProjectArgs,

        /// Standard assets directory
        #[arg(long, value_name = "ASSETS_PATH")]
        assets: Option<PathBuf>,

        /// Run in dev mode (also follows edits to the standard assets)
        #[arg(long)]
        dev: bool,

        /// Quiet period before a changed file is reloaded, in milliseconds
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },
    /// Print dictionary entries for one or more namespaces as JSON
    Dict {
        #[command(flatten)]
        project: ProjectArgs,

        /// Dictionary namespaces, e.g. `index` or `policynav`
        #[arg(value_name = "NAMESPACE", required = true)]
        namespaces: Vec<String>,
    },
    /// Print a widget as served, with its table schema attached
    Pagelet {
        #[command(flatten)]
        project: ProjectArgs,

        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Run a widget's data query and print the results as JSON
    Datalet {
        #[command(flatten)]
        project: ProjectArgs,

        #[arg(value_name = "NAME")]
        name: String,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Interactive watch sessions also log to the terminal; query commands
    // keep stdout clean for their JSON output.
    let (component, to_stderr) = match &cli.command {
        Commands::Watch { .. } => ("watch", true),
        _ => ("cli", false),
    };
    let _guard = lynkui_runtime::init_logging(component, to_stderr);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Watch {
            project,
            assets,
            dev,
            debounce_ms,
        } => {
            let mut config = project.service_config()?;
            if assets.is_some() {
                config.assets_path = assets;
            }
            if dev {
                config.run_mode = "dev".to_string();
            }
            if let Some(ms) = debounce_ms {
                config.debounce_ms = ms;
            }
            rt.block_on(watch::run(config))
        }
        Commands::Dict {
            project,
            namespaces,
        } => rt.block_on(query::dict(project.service_config()?, namespaces)),
        Commands::Pagelet { project, name } => {
            rt.block_on(query::pagelet(project.service_config()?, name))
        }
        Commands::Datalet { project, name } => {
            rt.block_on(query::datalet(project.service_config()?, name))
        }
    }
}
