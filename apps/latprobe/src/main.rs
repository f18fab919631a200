mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::AppConfig;
use latprobe_fping::{group_targets, parse_verbose, resolve_hosts, FpingConfig, FpingProbe, PROBE_KIND};
use latprobe_plugin::{ProbeRegistry, ProbeSpec, Scheduler};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "latprobe", version, about = "Periodic fping latency probe")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured probe at its interval and emit the measurements.
    Run(RunArgs),
    /// Validate the config, locate each probe's executable and list its targets.
    Check(ConfigArgs),
    /// Print each probe's host groups as JSON.
    Targets(ConfigArgs),
    /// Parse fping -C output from stdin and print one JSON record per host.
    Parse,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(short, long, default_value = "latprobe.yaml", env = "LATPROBE_CONFIG")]
    config: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Run a single cycle of every probe and exit.
    #[arg(long)]
    once: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli.command) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn builtin_registry() -> ProbeRegistry {
    let mut registry = ProbeRegistry::new();
    registry.register(PROBE_KIND, FpingProbe::factory);
    registry
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run_probes(args),
        Commands::Check(args) => run_check(args),
        Commands::Targets(args) => run_targets(args),
        Commands::Parse => run_parse(),
    }
}

fn load_config(args: &ConfigArgs, registry: &ProbeRegistry) -> Result<AppConfig> {
    tracing::info!(path = ?args.config, "loading configuration");
    let config = AppConfig::load(&args.config)?;
    config.validate(registry)?;
    Ok(config)
}

fn run_probes(args: RunArgs) -> Result<()> {
    let registry = builtin_registry();
    let config = load_config(&args.config, &registry)?;

    let mut scheduler = Scheduler::new(config.emitters()?);
    for spec in &config.probes {
        scheduler.add(registry.build(spec)?);
    }
    tracing::info!(probes = scheduler.len(), "probes ready");

    if args.once {
        scheduler.run_once()?;
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("failed to install signal handler")?;
    }

    scheduler.run_until(&stop)?;
    tracing::info!("stopped");
    Ok(())
}

fn fping_configs(config: &AppConfig) -> Result<Vec<FpingConfig>> {
    config
        .probes
        .iter()
        .filter(|spec| spec.kind == PROBE_KIND)
        .map(|spec: &ProbeSpec| {
            FpingConfig::from_options(spec.name.clone(), spec.options_value())
                .with_context(|| format!("invalid probe `{}`", spec.name))
        })
        .collect()
}

fn run_check(args: ConfigArgs) -> Result<()> {
    let registry = builtin_registry();
    let config = load_config(&args, &registry)?;

    for spec in &config.probes {
        let probe = registry.build(spec)?;
        tracing::info!(probe = probe.name(), kind = probe.kind(), interval = ?probe.interval(), "probe ok");
    }
    config.check_emitters()?;

    let mut stdout = io::stdout().lock();
    for fping in fping_configs(&config)? {
        let hosts = resolve_hosts(&fping);
        writeln!(stdout, "{}: {} host(s): {}", fping.name, hosts.len(), hosts.join(" "))?;
    }
    Ok(())
}

fn run_targets(args: ConfigArgs) -> Result<()> {
    let registry = builtin_registry();
    let config = load_config(&args, &registry)?;

    let table: BTreeMap<String, _> = fping_configs(&config)?
        .into_iter()
        .map(|fping| {
            let groups = group_targets(&fping);
            (fping.name, groups)
        })
        .collect();

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &table)?;
    writeln!(stdout)?;
    Ok(())
}

fn run_parse() -> Result<()> {
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut parsed = 0usize;
    let mut skipped = 0usize;

    for line in stdin.lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_verbose(&line) {
            Ok(stat) => {
                serde_json::to_writer(&mut stdout, &stat)?;
                writeln!(stdout)?;
                parsed += 1;
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping line");
                skipped += 1;
            }
        }
    }

    tracing::info!(parsed, skipped, "parse finished");
    Ok(())
}
