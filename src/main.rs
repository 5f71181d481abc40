//! termpilot command line
//!
//! Thin wrapper over the library for shell scripts: every subcommand maps to
//! one driver operation. Panes default to `$TMUX_PANE`.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use termpilot::config::ConfigLoader;
use termpilot::{
    keys, Driver, DriverConfig, LayoutFile, LayoutPlan, ScreenPredicate, SessionId, TmuxEmulator,
    WaitOutcome, WaitStrategy,
};

#[derive(Parser)]
#[command(name = "termpilot", version, about = "Drive terminal panes through tmux")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new tab and print its pane id
    Tab {
        #[command(flatten)]
        target: Target,
        /// Name for the new pane
        #[arg(long)]
        name: Option<String>,
    },
    /// Type text into a pane
    Send {
        text: String,
        #[command(flatten)]
        target: Target,
        /// Do not append a newline
        #[arg(short = 'n', long)]
        no_newline: bool,
    },
    /// Press special keys (enter, esc, up, ctrl-c, f1, ...)
    Keys {
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Print the visible screen
    Snapshot {
        #[command(flatten)]
        target: Target,
        /// Only print non-empty lines, prefixed with their row
        #[arg(long)]
        non_empty: bool,
    },
    /// Wait until the screen matches; exits 1 on timeout
    Wait {
        #[command(flatten)]
        predicate: PredicateArgs,
        #[command(flatten)]
        timing: TimingArgs,
        #[command(flatten)]
        target: Target,
    },
    /// Type a command, then wait until the screen matches
    Run {
        command: String,
        #[command(flatten)]
        predicate: PredicateArgs,
        #[command(flatten)]
        timing: TimingArgs,
        #[command(flatten)]
        target: Target,
    },
    /// Build a layout from a TOML or JSON file
    Layout {
        file: PathBuf,
        /// Pane to start splitting from
        #[arg(long)]
        root: Option<String>,
        /// Print the planned operations without touching the emulator
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the next repaints of a pane
    Watch {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Activate the pane with this name, creating a tab if none exists
    Reuse {
        name: String,
        #[command(flatten)]
        target: Target,
    },
    /// Close every other tab in the current window, keeping the first and this one
    Cleanup {
        #[command(flatten)]
        target: Target,
    },
    /// List panes
    List,
}

#[derive(Args)]
struct Target {
    /// Pane id such as %3 (defaults to $TMUX_PANE)
    #[arg(short, long)]
    pane: Option<String>,
}

impl Target {
    fn resolve(&self) -> anyhow::Result<SessionId> {
        resolve_pane(self.pane.as_deref())
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PredicateArgs {
    /// Match when any line contains this text
    #[arg(long)]
    contains: Option<String>,
    /// Match when any line matches this regex
    #[arg(long)]
    regex: Option<String>,
}

impl PredicateArgs {
    fn build(&self) -> anyhow::Result<ScreenPredicate> {
        match (&self.contains, &self.regex) {
            (Some(text), _) => Ok(ScreenPredicate::contains(text.clone())),
            (None, Some(pattern)) => Ok(ScreenPredicate::regex(pattern)?),
            (None, None) => Err(anyhow!("either --contains or --regex is required")),
        }
    }
}

#[derive(Args)]
struct TimingArgs {
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    interval_ms: Option<u64>,
    #[arg(long, value_enum)]
    mode: Option<Mode>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Polling,
    EventDriven,
}

impl From<Mode> for WaitStrategy {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Polling => WaitStrategy::Polling,
            Mode::EventDriven => WaitStrategy::EventDriven,
        }
    }
}

fn resolve_pane(explicit: Option<&str>) -> anyhow::Result<SessionId> {
    explicit
        .map(SessionId::new)
        .or_else(TmuxEmulator::current_pane)
        .ok_or_else(|| anyhow!("no pane given and $TMUX_PANE is not set; pass --pane"))
}

fn debug_requested(flag: bool) -> bool {
    flag || env::var("TERMPILOT_DEBUG").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Filter for the logging set up while configuration loads
fn bootstrap_filter(debug: bool, rust_log: Option<String>) -> String {
    rust_log.unwrap_or_else(|| if debug { "debug" } else { "warn" }.to_string())
}

/// Final filter once the configured level is known
fn logging_filter(debug: bool, rust_log: Option<String>, config: &DriverConfig) -> String {
    rust_log.unwrap_or_else(|| {
        if debug {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        }
    })
}

fn subscriber(filter: String) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish()
}

fn init_logging(debug: bool, config: &DriverConfig) -> anyhow::Result<()> {
    let filter = logging_filter(debug, env::var("RUST_LOG").ok(), config);
    tracing::subscriber::set_global_default(subscriber(filter))
        .context("failed to install logging")
}

/// Load configuration with a provisional subscriber so loader warnings
/// (such as a skipped invalid file) reach stderr
fn load_configuration(path: Option<&Path>, debug: bool) -> anyhow::Result<DriverConfig> {
    let provisional = subscriber(bootstrap_filter(debug, env::var("RUST_LOG").ok()));
    tracing::subscriber::with_default(provisional, || {
        let mut loader = ConfigLoader::new();
        loader.load(path).context("failed to load configuration")
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let debug = debug_requested(cli.debug);
    let config = load_configuration(cli.config.as_deref(), debug)?;
    init_logging(debug, &config)?;
    debug!("termpilot v{}", termpilot::VERSION);

    let driver = Driver::tmux(config);
    run(&driver, cli.command).await
}

async fn run(driver: &Driver, command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Tab { target, name } => {
            let parent = target.resolve()?;
            let pane = driver.open_tab(&parent).await?;
            if let Some(name) = name {
                driver.emulator().set_name(&pane, &name).await?;
            }
            println!("{}", pane);
        }
        Commands::Send {
            text,
            target,
            no_newline,
        } => {
            let pane = target.resolve()?;
            if no_newline {
                driver.send_text(&pane, &text).await?;
            } else {
                driver.send_line(&pane, &text).await?;
            }
        }
        Commands::Keys { names, target } => {
            let pane = target.resolve()?;
            let text = keys::encode_all(names.iter().map(String::as_str))?;
            driver.send_text(&pane, &text).await?;
        }
        Commands::Snapshot { target, non_empty } => {
            let snapshot = driver.snapshot(&target.resolve()?).await?;
            if non_empty {
                for (row, line) in snapshot.non_empty_lines() {
                    println!("{:>3}: {}", row, line);
                }
            } else {
                println!("{}", snapshot.text());
            }
        }
        Commands::Wait {
            predicate,
            timing,
            target,
        } => {
            let pane = target.resolve()?;
            let wait = completion_wait(driver, &predicate, &timing)?;
            let outcome = driver.wait_with(&pane, &wait).await?;
            return Ok(report(&outcome));
        }
        Commands::Run {
            command,
            predicate,
            timing,
            target,
        } => {
            let pane = target.resolve()?;
            let wait = completion_wait(driver, &predicate, &timing)?;
            let outcome = driver.run_and_wait(&pane, &command, &wait).await?;
            return Ok(report(&outcome));
        }
        Commands::Layout {
            file,
            root,
            dry_run,
        } => {
            let layout = LayoutFile::load(&file)?;
            if dry_run {
                let plan = LayoutPlan::for_layout(&layout.layout)?;
                for step in plan.steps() {
                    println!("{}", step);
                }
                return Ok(ExitCode::SUCCESS);
            }

            let root = resolve_pane(root.as_deref())?;
            let mapping = driver.launch_layout(&root, &layout).await?;
            for pane in &mapping {
                println!("{}\t{}", pane.label, pane.session);
            }
        }
        Commands::Watch { target, count } => {
            let pane = target.resolve()?;
            let delivered = driver
                .watch(&pane, count, |snapshot| {
                    println!("--- update {} ---", snapshot.generation());
                    for (_, line) in snapshot.non_empty_lines() {
                        println!("{}", line);
                    }
                })
                .await?;
            info!(delivered, "Watch finished");
        }
        Commands::Reuse { name, target } => {
            let parent = target.resolve()?;
            let acquired = driver.get_or_create(&parent, &name).await?;
            println!("{}", acquired.session());
        }
        Commands::Cleanup { target } => {
            let closed = driver.cleanup(&target.resolve()?).await?;
            println!("closed {} tab(s)", closed);
        }
        Commands::List => {
            for info in driver.emulator().list_sessions().await? {
                println!(
                    "{}\t{}\t{}\t{}{}",
                    info.id,
                    info.tab_id,
                    info.tab_index,
                    info.name.as_deref().unwrap_or("-"),
                    if info.active { "\t*" } else { "" }
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn completion_wait(
    driver: &Driver,
    predicate: &PredicateArgs,
    timing: &TimingArgs,
) -> anyhow::Result<termpilot::CompletionWait> {
    let mut wait = driver.completion_wait(predicate.build()?);
    if let Some(ms) = timing.timeout_ms {
        wait = wait.with_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = timing.interval_ms {
        wait = wait.with_poll_interval(Duration::from_millis(ms));
    }
    if let Some(mode) = timing.mode {
        wait = wait.with_strategy(mode.into());
    }
    wait.validate()?;
    Ok(wait)
}

fn report(outcome: &WaitOutcome) -> ExitCode {
    if outcome.matched {
        ExitCode::SUCCESS
    } else {
        eprintln!("timed out; last screen:");
        for (_, line) in outcome.last_snapshot.non_empty_lines() {
            eprintln!("{}", line);
        }
        ExitCode::from(1)
    }
}
