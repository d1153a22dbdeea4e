use std::sync::Arc;

use anyhow::Context;
use catscan_sdk::{CatscanConfig, Entry, ProbeOutcome, Registry, WriterStats};
use catscan_server::CatscanServer;
use colored::Colorize;
use tracing::info;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CatscanConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Count => cmd_count(&config).await,
        Command::Add(args) => cmd_add(&config, args).await,
        Command::Sample(args) => cmd_sample(&config, args).await,
        Command::Check(args) => cmd_check(&config, args).await,
        Command::Config => cmd_config(&config),
    }
}

fn open(config: &CatscanConfig) -> anyhow::Result<Registry> {
    Registry::open(config)
        .with_context(|| format!("failed to open registry at {}", config.store.path.display()))
}

async fn cmd_serve(mut config: CatscanConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if args.no_verify {
        config.verifier.enabled = false;
    }

    let registry = Arc::new(open(&config)?);
    registry.start_verifier()?;

    let server = CatscanServer::new(config.server.clone(), Arc::clone(&registry));
    let listener = server
        .bind()
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    println!(
        "{} catscan listening on {} (db: {})",
        "✓".green().bold(),
        config.server.bind_addr.to_string().bold(),
        config.store.path.display()
    );

    // Verifier first, so nothing new is evicted while requests finish.
    let signal_registry = Arc::clone(&registry);
    server
        .serve_on(listener, async move {
            shutdown_signal().await;
            info!("shutdown requested, stopping liveness verifier");
            signal_registry.stop_verifier().await;
        })
        .await?;

    let stats = registry.shutdown().await?;
    print_writer_stats(&stats);
    println!("{}", "catscan stopped.".dimmed());
    Ok(())
}

async fn cmd_count(config: &CatscanConfig) -> anyhow::Result<()> {
    let registry = open(config)?;
    let count = registry.count().await;
    registry.shutdown().await?;
    println!("{}", count?);
    Ok(())
}

async fn cmd_add(config: &CatscanConfig, args: AddArgs) -> anyhow::Result<()> {
    let registry = open(config)?;
    let added = registry.ingest(&args.id, &args.ext).await;
    let stats = registry.shutdown().await?;
    let entry = added?;
    if stats.inserted == 1 {
        println!("{} Entry added: {}", "✓".green().bold(), registry.link(&entry).cyan());
    } else {
        println!("{} {} already registered", "•".yellow(), entry.identifier().as_str().bold());
    }
    Ok(())
}

async fn cmd_sample(config: &CatscanConfig, args: SampleArgs) -> anyhow::Result<()> {
    let registry = open(config)?;
    let entries = registry.sample(args.count, args.ext.as_deref()).await;
    registry.shutdown().await?;
    let entries = entries?;
    if entries.is_empty() {
        println!("No entries found.");
    }
    for entry in &entries {
        println!("{}", registry.link(entry));
    }
    Ok(())
}

async fn cmd_check(config: &CatscanConfig, args: CheckArgs) -> anyhow::Result<()> {
    let entry = Entry::new(args.id, args.ext)?;
    let registry = open(config)?;
    let registered = registry.contains(entry.identifier()).await;
    let outcome = registry.check(&entry).await;
    registry.shutdown().await?;
    let link = registry.link(&entry);
    match outcome {
        ProbeOutcome::Alive => println!("{} {} is alive", "✓".green().bold(), link.cyan()),
        ProbeOutcome::Dead(reason) => {
            println!("{} {} is dead ({})", "✗".red().bold(), link.cyan(), reason)
        }
    }
    if !registered? {
        println!("  {}", "not registered".dimmed());
    }
    Ok(())
}

fn cmd_config(config: &CatscanConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_writer_stats(stats: &WriterStats) {
    println!(
        "  Writes: {} inserted, {} duplicates, {} removed, {} failed",
        stats.inserted.to_string().green(),
        stats.duplicates,
        stats.removed.to_string().yellow(),
        stats.failed.to_string().red()
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
