use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use unijar_archive::{EntrySource, RecordingSink, SinkEvent, ZipFileSink, ZipSource};
use unijar_merge::{MergeConfig, MergeReport};
use unijar_policy::PolicyRegistry;
use unijar_types::{EntryName, EntryRecord};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Merge(args) => cmd_merge(args, cli.format),
        Command::Policy(args) => cmd_policy(args, cli.format),
        Command::List(args) => cmd_list(args, cli.format),
    }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Result of `unijar merge`, printed as text or JSON.
#[derive(Debug, Serialize)]
pub struct MergeOutcome {
    pub output: Option<PathBuf>,
    /// BLAKE3 of the output archive bytes.
    pub digest: Option<String>,
    /// Entries that would be written, for `--dry-run`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<String>,
    pub report: MergeReport,
}

fn load_config(policy: Option<&Path>, no_duplicates: bool) -> anyhow::Result<MergeConfig> {
    let config = match policy {
        Some(path) => MergeConfig::load(path)?,
        None => MergeConfig::default(),
    };
    Ok(if no_duplicates {
        config.reject_duplicates()
    } else {
        config
    })
}

fn open_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<ZipSource<BufReader<File>>>> {
    paths
        .iter()
        .enumerate()
        .map(|(position, path)| {
            ZipSource::open(position, path)
                .with_context(|| format!("opening input {}", path.display()))
        })
        .collect()
}

fn digest_file(path: &Path) -> anyhow::Result<String> {
    let mut file = File::open(path).with_context(|| format!("reading {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Validate the policy, then merge. The policy is checked before any input
/// is opened.
pub fn execute_merge(args: &MergeArgs) -> anyhow::Result<MergeOutcome> {
    let mut config = load_config(args.policy.as_deref(), args.no_duplicates)?;
    if let Some(compression) = args.compression {
        config.output.compression = compression.into();
    }
    let engine = config.engine()?;
    let mut inputs = open_inputs(&args.inputs)?;

    if args.dry_run {
        let mut events = Vec::new();
        let (report, ()) = engine.run(&mut inputs, RecordingSink::new(&mut events))?;
        let entries = events
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Write { name, .. } => Some(name.to_string()),
                SinkEvent::Close => None,
            })
            .collect();
        return Ok(MergeOutcome {
            output: None,
            digest: None,
            entries,
            report,
        });
    }

    let output = args
        .output
        .as_deref()
        .context("an output path is required unless --dry-run is given")?;
    let sink = ZipFileSink::create(output, config.output.clone())
        .with_context(|| format!("creating {}", output.display()))?;
    let (report, path) = engine.run(&mut inputs, sink)?;
    let digest = digest_file(&path)?;
    tracing::info!(output = %path.display(), digest = %digest, "output written");

    Ok(MergeOutcome {
        output: Some(path),
        digest: Some(digest),
        entries: Vec::new(),
        report,
    })
}

fn cmd_merge(args: MergeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = execute_merge(&args)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let report = &outcome.report;
    match &outcome.output {
        Some(path) => println!(
            "{} Merged {} inputs into {}",
            "✓".green().bold(),
            report.inputs,
            path.display().to_string().bold()
        ),
        None => {
            println!("{} Dry run over {} inputs", "✓".green().bold(), report.inputs);
            for name in &outcome.entries {
                println!("  {name}");
            }
        }
    }
    println!(
        "  Entries: {} seen, {} written, {} skipped, {} duplicates resolved",
        report.entries_seen,
        report.entries_written.to_string().green(),
        report.entries_skipped,
        report.duplicates_resolved.to_string().yellow()
    );
    for (strategy, count) in &report.strategies {
        println!("  {:<18} {count}", strategy.cyan());
    }
    println!("  Policy: {}", report.policy_fingerprint.dimmed());
    if let Some(digest) = &outcome.digest {
        println!("  Digest: {}", digest.dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// policy
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub name: String,
    pub rule: usize,
    pub matcher: String,
    pub strategy: String,
}

/// Classify each name against the registry.
pub fn classify_names(
    registry: &PolicyRegistry,
    names: &[String],
) -> anyhow::Result<Vec<Classification>> {
    names
        .iter()
        .map(|name| {
            let entry = EntryName::new(name.as_str())
                .with_context(|| format!("invalid entry name {name:?}"))?;
            let index = registry.position(&entry);
            let rule = &registry.rules()[index];
            Ok(Classification {
                name: name.clone(),
                rule: index,
                matcher: rule.matcher.to_string(),
                strategy: rule.strategy.to_string(),
            })
        })
        .collect()
}

fn cmd_policy(args: PolicyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.policy.as_deref(), args.no_duplicates)?;
    let registry = config.registry()?;

    if !args.check.is_empty() {
        let checks = classify_names(&registry, &args.check)?;
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&checks)?);
            return Ok(());
        }
        for check in &checks {
            println!(
                "{} → {} (rule #{}: {})",
                check.name.bold(),
                check.strategy.cyan(),
                check.rule,
                check.matcher
            );
        }
        return Ok(());
    }

    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "fingerprint": registry.fingerprint_hex(),
            "rules": registry.rules(),
            "catch_all": registry.catch_all_index(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Policy {}", registry.fingerprint_hex().dimmed());
    for (index, rule) in registry.rules().iter().enumerate() {
        let line = format!("  #{index:<3} {rule}");
        if index > registry.catch_all_index() {
            println!("{} {}", line.dimmed(), "(unreachable)".yellow());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

/// Every entry record of the archive at `path`, in archive order.
pub fn list_entries(path: &Path) -> anyhow::Result<Vec<EntryRecord>> {
    let mut source =
        ZipSource::open(0, path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::with_capacity(source.len());
    for index in 0..source.len() {
        records.push(source.record(index)?);
    }
    Ok(records)
}

fn cmd_list(args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let records = list_entries(&args.input)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for record in &records {
        println!(
            "{:>10}  {:<8}  {}  {}",
            record.size,
            record.compression.to_string(),
            format!("{:08x}", record.crc32).dimmed(),
            record.name
        );
    }
    println!("{} entries", records.len().to_string().bold());
    Ok(())
}
