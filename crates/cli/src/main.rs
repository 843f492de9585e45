//! DSC Runner CLI - list, test and apply DSC configuration profiles

mod logging;
mod output;
mod settings;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dsc_runner_core::application::{
    cleanup_staging, probe_engine, ExecutionService, ProfileService,
};
use dsc_runner_core::domain::{ExecutionMode, ExecutionResult};
use dsc_runner_core::port::{ProcessRunner, ProfileSource};
use dsc_runner_core::AppError;
use dsc_runner_infra_cache::FileCacheStore;
use dsc_runner_infra_source::{DirectoryProfileSource, GitHubProfileSource, GitHubSourceConfig};
use dsc_runner_infra_system::SubprocessRunner;
use settings::{Settings, SourceKind};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "dsc-runner")]
#[command(about = "Run DSC v3 configuration profiles", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/dsc-runner/config.toml)
    #[arg(long, global = true, env = "DSC_RUNNER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available profiles
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the raw content of a profile
    Show {
        /// Profile name (`git`) or file name (`git-configuration.dsc.yaml`)
        profile: String,
    },

    /// Check the system against profiles (read-only)
    Test {
        /// Profiles to test
        #[arg(required = true)]
        profiles: Vec<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Apply profiles to the system
    Apply {
        /// Profiles to apply
        profiles: Vec<String>,

        /// Apply every available profile
        #[arg(long, conflicts_with_all = ["profiles", "file"])]
        all: bool,

        /// Apply a local profile file instead of a published one
        #[arg(long, conflicts_with = "profiles")]
        file: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Clear the profile cache and fetch a fresh listing
    Update,

    /// Check that the configuration engine is installed
    Doctor,
}

#[derive(Args, Clone, Copy)]
struct RunArgs {
    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Show every resource, not only failures
    #[arg(short, long)]
    verbose: bool,

    /// Keep going after a failed profile
    #[arg(long = "continue")]
    keep_going: bool,
}

/// What to run for one batch entry
enum Target {
    Profile(String),
    File(PathBuf),
}

/// Composition root: wires settings into the concrete adapters
struct App {
    settings: Settings,
    runner: Arc<dyn ProcessRunner>,
    cache: Arc<FileCacheStore>,
    profiles: ProfileService,
    cancel: CancellationToken,
}

impl App {
    fn build(settings: Settings, cancel: CancellationToken) -> Result<Self> {
        let upstream: Arc<dyn ProfileSource> = match settings.source.kind {
            SourceKind::GitHub => Arc::new(GitHubProfileSource::new(GitHubSourceConfig {
                owner: settings.source.owner.clone(),
                repo: settings.source.repo.clone(),
                git_ref: settings.source.git_ref.clone(),
                ..GitHubSourceConfig::default()
            })?),
            SourceKind::Directory => {
                let path = settings
                    .source
                    .path
                    .clone()
                    .context("source.path must be set when source.kind = \"directory\"")?;
                Arc::new(DirectoryProfileSource::new(path))
            }
        };

        let cache = Arc::new(
            FileCacheStore::new(
                upstream,
                &settings.cache_dir,
                Duration::from_secs(settings.cache_ttl_secs),
            )
            .with_context(|| {
                format!("Failed to open cache at {}", settings.cache_dir.display())
            })?,
        );

        let runner: Arc<dyn ProcessRunner> = Arc::new(SubprocessRunner::new());
        let executor = Arc::new(ExecutionService::new(runner.clone(), &settings.engine));
        let profiles = ProfileService::new(cache.clone(), executor, &settings.staging_dir);

        Ok(Self {
            settings,
            runner,
            cache,
            profiles,
            cancel,
        })
    }

    async fn list(&self, json: bool) -> Result<bool> {
        let profiles = self.profiles.list().await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        } else if profiles.is_empty() {
            println!("{}", "No profiles found".yellow());
        } else {
            println!("{}", output::profiles_table(&profiles));
        }
        Ok(true)
    }

    async fn show(&self, profile: &str) -> Result<bool> {
        let content = self.profiles.content(profile).await?;
        print!("{}", content);
        Ok(true)
    }

    async fn update(&self) -> Result<bool> {
        self.cache.invalidate().await;
        println!("{}", "Cache cleared.".dimmed());

        let profiles = self.profiles.list().await?;
        println!(
            "{} Refreshed {} profiles",
            "✓".green(),
            profiles.len().to_string().bold()
        );
        Ok(true)
    }

    async fn doctor(&self) -> Result<bool> {
        let info = probe_engine(self.runner.as_ref(), &self.settings.engine, &self.cancel).await?;

        println!("{}", "Environment".cyan().bold());
        println!("{}", output::format_engine(&info));
        println!("  {} {}", "Cache:".bold(), self.cache.cache_dir().display());
        println!("  {} {}", "Staging:".bold(), self.settings.staging_dir.display());
        Ok(info.available)
    }

    /// Run a batch; stops at the first failed profile unless `keep_going`
    async fn run_batch(
        &self,
        targets: Vec<Target>,
        mode: ExecutionMode,
        args: RunArgs,
    ) -> Result<bool> {
        if targets.is_empty() {
            println!("{}", "No profiles to run.".yellow());
            return Ok(true);
        }

        self.ensure_engine().await?;
        cleanup_staging(&self.settings.staging_dir).await;

        let mut results: Vec<ExecutionResult> = Vec::new();
        let mut all_passed = true;

        for target in targets {
            let outcome = match &target {
                Target::Profile(name) => match mode {
                    ExecutionMode::Test => self.profiles.test(name, &self.cancel).await,
                    ExecutionMode::Apply => self.profiles.apply(name, &self.cancel).await,
                },
                Target::File(path) => self.profiles.run_file(path, mode, &self.cancel).await,
            };

            let result = match outcome {
                Ok(result) => result,
                Err(AppError::Cancelled) => bail!("Cancelled"),
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!("Failed to run {}", target)))
                }
            };

            if !args.json {
                println!("{}", output::format_result(&result, args.verbose));
            }

            let passed = result.success();
            results.push(result);

            if !passed {
                all_passed = false;
                if !args.keep_going {
                    break;
                }
            }
        }

        if args.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            println!();
            println!("{}", output::format_summary(&results));
        }

        info!(profiles = results.len(), success = all_passed, mode = %mode, "Batch finished");
        Ok(all_passed)
    }

    async fn ensure_engine(&self) -> Result<()> {
        let info = probe_engine(self.runner.as_ref(), &self.settings.engine, &self.cancel).await?;
        if !info.available {
            bail!(
                "Configuration engine '{}' was not found or did not start. \
                 Install DSC v3 and make sure it is on PATH (see `dsc-runner doctor`).",
                info.engine
            );
        }
        debug!(engine = %info.engine, version = ?info.version, "Engine available");
        Ok(())
    }

    async fn apply_targets(
        &self,
        profiles: Vec<String>,
        all: bool,
        file: Option<PathBuf>,
    ) -> Result<Vec<Target>> {
        if let Some(file) = file {
            return Ok(vec![Target::File(file)]);
        }
        if all {
            let listing = self.profiles.list().await?;
            return Ok(listing
                .into_iter()
                .map(|p| Target::Profile(p.file_name))
                .collect());
        }
        if profiles.is_empty() {
            bail!("Nothing to apply: name one or more profiles, or use --all or --file");
        }
        Ok(profiles.into_iter().map(Target::Profile).collect())
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Profile(name) => write!(f, "profile '{}'", name),
            Target::File(path) => write!(f, "file '{}'", path.display()),
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    debug!(?settings, "Settings loaded");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let app = App::build(settings, cancel)?;

    match cli.command {
        Commands::List { json } => app.list(json).await,
        Commands::Show { profile } => app.show(&profile).await,
        Commands::Test { profiles, run } => {
            let targets = profiles.into_iter().map(Target::Profile).collect();
            app.run_batch(targets, ExecutionMode::Test, run).await
        }
        Commands::Apply {
            profiles,
            all,
            file,
            run,
        } => {
            let targets = app.apply_targets(profiles, all, file).await?;
            app.run_batch(targets, ExecutionMode::Apply, run).await
        }
        Commands::Update => app.update().await,
        Commands::Doctor => app.doctor().await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("{} {:#}", "warning:".yellow(), e);
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
