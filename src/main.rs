use anyhow::{bail, Context, Result};
use ci_config::cli::commands::{
    BranchCommand, DeterminizeCommand, ImagesCommand, RegistryArgs, RegistryMetadataCommand, ResolveCommand,
    ValidateCommand, WatchCommand,
};
use ci_config::cli::output::*;
use ci_config::cli::{Cli, Command};
use ci_config::registry::generate_metadata;
use ci_config::store::{non_canonical, ConfigAgent, ConfigSource, RegistryAgent, RegistrySource};
use ci_config::{
    derive_store, load_registry, resolve_config, test_input_images, ConfigStore, Registry, RegistryError,
    ReleaseBuildConfiguration,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Logs go to stderr; stdout carries command output
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Resolve(cmd) => resolve(cmd)?,
        Command::Images(cmd) => images(cmd)?,
        Command::Branch(cmd) => branch(cmd)?,
        Command::Determinize(cmd) => determinize(cmd)?,
        Command::RegistryMetadata(cmd) => registry_metadata(cmd)?,
        Command::Validate(cmd) => validate(cmd)?,
        Command::Watch(cmd) => watch(cmd).await?,
    }

    Ok(())
}

fn load(args: &RegistryArgs) -> Result<Registry> {
    load_registry(&args.registry, args.flat_registry)
        .with_context(|| format!("Failed to load registry from {}", args.registry.display()))
}

/// Resolve or exit with every resolution failure listed
fn resolve_or_exit(config: &ReleaseBuildConfiguration, registry: &Registry) -> ReleaseBuildConfiguration {
    match resolve_config(config, registry) {
        Ok(resolved) => resolved,
        Err(err) => {
            eprintln!("{} Failed to resolve configuration:", CROSS);
            eprintln!("{}", format_resolve_error(&err));
            std::process::exit(1);
        }
    }
}

fn resolve(cmd: &ResolveCommand) -> Result<()> {
    let registry = load(&cmd.registry)?;

    let config = match (&cmd.config, &cmd.config_dir) {
        (Some(path), _) => ReleaseBuildConfiguration::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        (None, Some(dir)) => {
            let metadata = cmd
                .target
                .metadata()
                .context("--config-dir needs --org, --repo and --branch")?;
            ConfigStore::load(dir)?.get_matching_config(&metadata)?.clone()
        }
        (None, None) => bail!("Either --config or --config-dir is required"),
    };

    let resolved = resolve_or_exit(&config, &registry);
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn images(cmd: &ImagesCommand) -> Result<()> {
    let mut config = ReleaseBuildConfiguration::from_file(&cmd.config)
        .with_context(|| format!("Failed to load configuration {}", cmd.config.display()))?;

    if let Some(path) = &cmd.registry {
        let registry = load(&RegistryArgs {
            registry: path.clone(),
            flat_registry: cmd.flat_registry,
        })?;
        config = resolve_or_exit(&config, &registry);
    }

    let images = test_input_images(&config)?;
    println!("{}", serde_json::to_string_pretty(&images)?);
    Ok(())
}

fn branch(cmd: &BranchCommand) -> Result<()> {
    let store = ConfigStore::load(&cmd.config_dir)
        .with_context(|| format!("Failed to load configurations from {}", cmd.config_dir.display()))?;
    let releases = cmd.releases();

    let derived = derive_store(&releases, &store, |metadata| cmd.selects(metadata))?;
    if derived.is_empty() {
        println!("{} No configurations promote to {}", INFO, style(&releases.current).bold());
        return Ok(());
    }

    if !cmd.confirm {
        for output in &derived {
            println!("{} Would write {}", BRANCH, format_config(&output.info.metadata));
        }
        println!("\n{} Dry run; pass {} to write {} configurations", WARN, style("--confirm").bold(), derived.len());
        return Ok(());
    }

    let progress = create_progress_bar(derived.len());
    for output in &derived {
        progress.set_message(output.info.metadata.to_string());
        let path = output
            .commit_to(&cmd.config_dir)
            .with_context(|| format!("Failed to write {}", output.info.metadata))?;
        progress.suspend(|| println!("{} Wrote {}", CHECK, style(path.display()).dim()));
        progress.inc(1);
    }
    progress.finish_and_clear();
    Ok(())
}

fn determinize(cmd: &DeterminizeCommand) -> Result<()> {
    let changed = non_canonical(&cmd.config_dir)
        .with_context(|| format!("Failed to check configurations in {}", cmd.config_dir.display()))?;

    if changed.is_empty() {
        println!("{} All configurations are in canonical form", CHECK);
        return Ok(());
    }

    for data in &changed {
        if cmd.confirm {
            data.commit_to(&cmd.config_dir)
                .with_context(|| format!("Failed to write {}", data.info.metadata))?;
            println!("{} Rewrote {}", CHECK, format_config(&data.info.metadata));
        } else {
            println!("{} Not canonical: {}", WARN, format_config(&data.info.metadata));
        }
    }
    Ok(())
}

fn registry_metadata(cmd: &RegistryMetadataCommand) -> Result<()> {
    let metadata = generate_metadata(&cmd.registry)
        .with_context(|| format!("Failed to generate metadata for {}", cmd.registry.display()))?;
    let json = serde_json::to_string_pretty(&metadata)?;

    match &cmd.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Wrote metadata for {} files to {}", CHECK, metadata.len(), style(path.display()).dim());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn validate(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating registry...", INFO);
    let registry = load(&cmd.registry)?;

    let mut failed = false;
    let mut report = serde_json::json!({
        "refs": registry.refs.len(),
        "chains": registry.chains.len(),
        "workflows": registry.workflows.len(),
        "errors": [],
    });

    match registry.validate() {
        Ok(()) => {
            println!("{} Registry is valid!", CHECK);
            println!("  Refs: {}", style(registry.refs.len()).cyan());
            println!("  Chains: {}", style(registry.chains.len()).cyan());
            println!("  Workflows: {}", style(registry.workflows.len()).cyan());
        }
        Err(RegistryError::Invalid(err)) => {
            failed = true;
            println!("{} Registry validation failed:", CROSS);
            println!("{}", format_resolve_error(&err));
            report["errors"] = err.causes().iter().map(|e| e.to_string()).collect();
        }
        Err(err) => return Err(err.into()),
    }

    if let Some(dir) = &cmd.config_dir {
        let store = ConfigStore::load(dir)
            .with_context(|| format!("Failed to load configurations from {}", dir.display()))?;
        let mut broken = serde_json::Map::new();
        for data in store.iter() {
            if let Err(err) = resolve_config(&data.configuration, &registry) {
                println!("{} {}", CROSS, format_config(&data.info.metadata));
                println!("{}", format_resolve_error(&err));
                broken.insert(
                    data.info.metadata.to_string(),
                    err.causes().iter().map(|e| e.to_string()).collect(),
                );
            }
        }
        if broken.is_empty() {
            println!("{} All {} configurations resolve", CHECK, style(store.len()).cyan());
        }
        failed |= !broken.is_empty();
        report["configs"] = store.len().into();
        report["broken"] = broken.into();
    }

    if cmd.json {
        println!("\n{}", serde_json::to_string_pretty(&report)?);
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn watch(cmd: &WatchCommand) -> Result<()> {
    let registry_dir = cmd.registry.registry.clone();
    let flat = cmd.registry.flat_registry;
    let config_dir = cmd.config_dir.clone();

    let (registry, configs) = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok((
            RegistryAgent::for_registry_dir(registry_dir, flat)?,
            ConfigAgent::for_config_dir(config_dir)?,
        ))
    })
    .await??;
    let registry = Arc::new(registry);
    let configs = Arc::new(configs);

    let cycle = Duration::from_secs(cmd.cycle);
    let handles = [
        Arc::clone(&registry).spawn_reloader(cycle),
        Arc::clone(&configs).spawn_reloader(cycle),
    ];
    println!(
        "{} Watching {} and {} every {}s (Ctrl-C to stop)",
        INFO,
        style(cmd.registry.registry.display()).bold(),
        style(cmd.config_dir.display()).bold(),
        cmd.cycle
    );

    let mut report = tokio::time::interval(cycle);
    loop {
        tokio::select! {
            _ = report.tick() => {
                let broken = configs
                    .snapshot()
                    .data
                    .iter()
                    .filter(|data| registry.resolve_config(&data.configuration).is_err())
                    .count();
                info!(
                    "registry generation {}, config generation {}, {} configurations fail to resolve",
                    RegistrySource::generation(registry.as_ref()),
                    ConfigSource::generation(configs.as_ref()),
                    broken
                );
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    error!("Failed to listen for Ctrl-C: {}", err);
                }
                break;
            }
        }
    }

    handles.iter().for_each(|handle| handle.abort());
    println!("{} Stopped", CHECK);
    Ok(())
}
