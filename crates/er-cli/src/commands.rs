use anyhow::Context;
use colored::Colorize;
use er_sdk::{
    DeleteReport, ElementView, Inspection, KeyTtl, QueryPage, Registry, RegistryConfig,
    StoredResult, UpsertReport,
};
use serde::Serialize;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;
    debug!(address = %config.store.address(), prefix = %config.prefix, "connecting");
    let mut registry = Registry::connect(config).context("cannot open registry")?;
    let format = cli.format;

    match cli.command {
        Command::Ping => {
            registry.ping()?;
            emit(format, &serde_json::json!({ "ok": true }), || {
                println!("{} store reachable", "✓".green().bold())
            })
        }
        Command::Put(args) => {
            let report = registry.upsert(&args.name, &args.bits)?;
            emit(format, &report, || print_upsert(&report))
        }
        Command::Get(args) => {
            let view = registry.get(&args.name, args.limit)?;
            emit(format, &view, || print_element(&view))
        }
        Command::Delete(args) => {
            let report = registry.delete(&args.name, args.force)?;
            emit(format, &report, || print_delete(&report))
        }
        Command::Find(args) => page(format, registry.find(args.bit, args.limit)?),
        Command::FindAll(args) => page(format, registry.find_all(&args.bits, args.limit)?),
        Command::FindAny(args) => page(format, registry.find_any(&args.bits, args.limit)?),
        Command::FindNot(args) => page(
            format,
            registry.find_not(args.include, &args.exclude, args.limit)?,
        ),
        Command::UniverseNot(args) => page(format, registry.universe_not(&args.bits, args.limit)?),
        Command::AllNot(args) => page(
            format,
            registry.all_not(args.include, &args.exclude, args.limit)?,
        ),
        Command::StoreAll(args) => stored(format, registry.store_all(args.ttl, &args.bits)?),
        Command::StoreAny(args) => stored(format, registry.store_any(args.ttl, &args.bits)?),
        Command::StoreNot(args) => stored(format, registry.store_not(args.ttl, &args.bits)?),
        Command::StoreAllNot(args) => stored(
            format,
            registry.store_all_not(args.ttl, args.include, &args.exclude)?,
        ),
        Command::Inspect(args) => {
            let view = registry.inspect(&args.key, args.limit)?;
            emit(format, &view, || print_inspection(&view))
        }
        Command::Drop(args) => {
            let deleted = registry.delete_stored(&args.key)?;
            emit(format, &serde_json::json!({ "deleted": deleted }), || {
                if deleted > 0 {
                    println!("{} dropped {}", "✓".green(), args.key.yellow());
                } else {
                    println!("{} already gone", args.key.yellow());
                }
            })
        }
    }
}

/// File (if any), then environment, then command-line flags.
fn build_config(cli: &Cli) -> anyhow::Result<RegistryConfig> {
    let mut config = match &cli.config {
        Some(path) => RegistryConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RegistryConfig::default(),
    };
    config.apply_env()?;
    if let Some(host) = &cli.host {
        config.store.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.store.port = port;
    }
    if let Some(prefix) = &cli.prefix {
        config.prefix = prefix.clone();
    }
    Ok(config)
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn page(format: OutputFormat, page: QueryPage) -> anyhow::Result<()> {
    emit(format, &page, || {
        for name in &page.names {
            println!("{name}");
        }
        let summary = format!("{} of {} shown", page.returned, page.count);
        if page.returned < page.count {
            println!("{} (limit {})", summary.yellow(), page.limit);
        } else {
            println!("{}", summary.dimmed());
        }
    })
}

fn stored(format: OutputFormat, result: StoredResult) -> anyhow::Result<()> {
    emit(format, &result, || {
        println!("{} {}", "stored".green().bold(), result.dest_key.yellow());
        println!("  members: {}", result.cardinality.to_string().bold());
        if result.cardinality == 0 {
            println!("  {}", "empty result, no key created".dimmed());
        } else {
            println!("  expires in {}s", result.ttl_seconds);
        }
    })
}

fn print_upsert(report: &UpsertReport) {
    println!(
        "{} {} ({} bits, +{} -{})",
        "✓".green().bold(),
        report.name.bold(),
        report.written_bits,
        report.added.to_string().green(),
        report.removed.to_string().red()
    );
}

fn print_element(view: &ElementView) {
    let bits: Vec<String> = view.bits.iter().map(|b| b.to_string()).collect();
    println!("{} [{}]", view.name.bold(), bits.join(" ").cyan());
    if view.bits.len() < view.count {
        println!("{}", format!("{} of {} bits shown", view.bits.len(), view.count).yellow());
    }
}

fn print_delete(report: &DeleteReport) {
    let verb = if report.record_deleted { "deleted" } else { "no record for" };
    println!(
        "{} {} {} ({} index entries removed)",
        "✓".green(),
        verb,
        report.name.bold(),
        report.unindexed
    );
    if report.needs_force() {
        println!(
            "{} flags were unreadable; index sets not scrubbed, rerun with --force",
            "warning:".yellow().bold()
        );
    }
}

fn print_inspection(view: &Inspection) {
    println!("{}", view.dest_key.yellow().bold());
    match view.ttl_remaining {
        KeyTtl::Expires(secs) => println!("  expires in {secs}s"),
        KeyTtl::Persistent => println!("  {}", "no expiry".red()),
        KeyTtl::Missing => println!("  {}", "missing or expired".dimmed()),
    }
    println!("  members: {}", view.count);
    for name in &view.members {
        println!("  {name}");
    }
}
