use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vertex_serve::config::{self, ServeConfig};
use vertex_serve::console::{Console, TerminalConsole};
use vertex_serve::docker::SystemRunner;
use vertex_serve::session::{Controller, SessionOutcome};

#[derive(Parser)]
#[command(name = "vertex-serve")]
#[command(about = "Serve the current project from a Docker container")]
#[command(version)]
struct Cli {
    /// Project directory to mount (default: nearest ancestor with artisan, composer.json or .vertex.yml)
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Image to run, e.g. eduard44/vertex or acme/site:dev
    #[arg(long)]
    image: Option<String>,

    /// Container runtime CLI
    #[arg(long)]
    runtime: Option<String>,

    /// Port mapping; repeat for several. Replaces the configured mappings.
    #[arg(short, long)]
    publish: Vec<String>,

    /// Extra argument for `run`, placed before the image; repeatable
    #[arg(long = "run-arg", allow_hyphen_values = true)]
    run_args: Vec<String>,

    /// Skip the daemon availability check
    #[arg(long)]
    no_preflight: bool,

    /// Print the launch command and exit
    #[arg(long)]
    dry_run: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, cfg: &mut ServeConfig) {
        if let Some(image) = &self.image {
            cfg.image = image.clone();
        }
        if let Some(runtime) = &self.runtime {
            cfg.runtime = runtime.clone();
        }
        if !self.publish.is_empty() {
            cfg.publish = self.publish.clone();
        }
        cfg.extra_args.extend(self.run_args.iter().cloned());
        if self.no_preflight {
            cfg.preflight = false;
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    let root = config::resolve_project_root(cli.project_root.as_deref(), &cwd)?;
    let mut cfg = config::load(&root).context("failed to load project config")?;
    cli.apply(&mut cfg);
    debug!(root = %root.display(), ?cfg, "resolved configuration");

    let console = Arc::new(TerminalConsole);
    let controller = Controller::new(&cfg, &root, Arc::new(SystemRunner), console.clone());

    if cli.dry_run {
        console.command(&controller.launch_command());
        return Ok(());
    }

    match controller.run().context("failed to serve container")? {
        SessionOutcome::Exited => info!("container exited"),
        SessionOutcome::Interrupted => info!("container terminated on interrupt"),
    }
    Ok(())
}
