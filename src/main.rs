use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use html_patcher::changelog::{append_jsonl, read_jsonl, ChangelogRecorder, ExecutionLog};
use html_patcher::config::{
    load_script_from_path, load_settings_from_path, run_script, EditorSettings, StepResult,
};
use html_patcher::edit::write_atomic;
use html_patcher::{
    dom, logging, ChangelogEntry, EditRequest, EditStatus, Pipeline, RepairReport, Selector,
};
use serde_json::{Map, Value};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "HTML_PATCHER_CONFIG";

#[derive(Parser)]
#[command(name = "html-patcher")]
#[command(about = "Structural HTML editing with automatic repair and changelogs", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (falls back to $HTML_PATCHER_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level diagnostics on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one edit, then validate, repair and record it
    Apply {
        /// HTML file to edit
        file: PathBuf,

        /// Operation to perform
        #[arg(long, value_parser = ["insert", "delete", "replace"])]
        op: String,

        /// Selector of the target element
        #[arg(short, long)]
        target: String,

        /// Markup to insert or replace with
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the markup from a file instead
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Where inserted markup goes relative to the target
        #[arg(long, default_value = "before", value_parser = ["before", "after", "append"])]
        position: String,

        /// Extra changelog parameter, e.g. --param type=testimonials
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Record the edit as voice-triggered
        #[arg(long)]
        voice: bool,

        /// Write the result back to FILE (otherwise print it)
        #[arg(short, long)]
        write: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// JSON-lines changelog to read history from and append to
        #[arg(long)]
        changelog: Option<PathBuf>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every edit of a TOML edit script
    Run {
        /// HTML file to edit
        file: PathBuf,

        /// Edit script
        #[arg(short, long)]
        script: PathBuf,

        /// Write the result back to FILE (otherwise print it)
        #[arg(short, long)]
        write: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// JSON-lines changelog to read history from and append to
        #[arg(long)]
        changelog: Option<PathBuf>,
    },

    /// Validate and repair without editing
    Check {
        /// HTML file to check
        file: PathBuf,

        /// Write repairs back to FILE
        #[arg(short, long)]
        write: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Turn an execution log (JSON) into a changelog entry
    Log {
        /// Execution log file, or - for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Record the entry as voice-triggered
        #[arg(long)]
        voice: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings = resolve_settings(cli.config)?;

    match cli.command {
        Commands::Apply {
            file,
            op,
            target,
            content,
            content_file,
            position,
            params,
            voice,
            write,
            diff,
            changelog,
            json,
        } => {
            let content = match (content, content_file) {
                (Some(content), _) => Some(content),
                (None, Some(path)) => Some(
                    fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                (None, None) => None,
            };

            let mut parameters: Map<String, Value> = params
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            parameters.insert("target_selector".into(), Value::String(target));
            if let Some(content) = content {
                parameters.insert("content".into(), Value::String(content));
            }
            if op == "insert" {
                parameters.insert("position".into(), Value::String(position));
            }

            let request = EditRequest::new(op, parameters).voice(voice);
            cmd_apply(
                settings,
                &file,
                &request,
                OutputOptions { write, diff, json },
                changelog.as_deref(),
            )
        }

        Commands::Run {
            file,
            script,
            write,
            diff,
            changelog,
        } => cmd_run(
            settings,
            &file,
            &script,
            OutputOptions {
                write,
                diff,
                json: false,
            },
            changelog.as_deref(),
        ),

        Commands::Check { file, write, json } => cmd_check(settings, &file, write, json),

        Commands::Log { input, voice } => cmd_log(settings, &input, voice),
    }
}

#[derive(Clone, Copy)]
struct OutputOptions {
    write: bool,
    diff: bool,
    json: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Resolve settings
///
/// Priority order:
/// 1. Explicit --config flag
/// 2. HTML_PATCHER_CONFIG environment variable
/// 3. Built-in defaults
fn resolve_settings(cli_config: Option<PathBuf>) -> Result<EditorSettings> {
    if let Some(path) = cli_config {
        return Ok(load_settings_from_path(&path)?);
    }

    if let Ok(env_path) = env::var(CONFIG_ENV) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(load_settings_from_path(&path)?);
        }
        eprintln!(
            "{}",
            format!("Warning: {CONFIG_ENV} is set but path doesn't exist: {env_path}").yellow()
        );
    }

    Ok(EditorSettings::default())
}

fn read_document(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

fn read_history(changelog: Option<&Path>) -> Result<Vec<ChangelogEntry>> {
    match changelog {
        Some(path) if path.exists() => Ok(read_jsonl(path)?),
        _ => Ok(Vec::new()),
    }
}

fn cmd_apply(
    settings: EditorSettings,
    file: &Path,
    request: &EditRequest,
    output: OutputOptions,
    changelog: Option<&Path>,
) -> Result<()> {
    let original = read_document(file)?;
    let history = read_history(changelog)?;

    let pipeline = Pipeline::new(settings);
    let outcome = pipeline.run(&original, request, &history);

    if let (Some(path), Some(entry)) = (changelog, &outcome.entry) {
        append_jsonl(path, entry)?;
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        match &outcome.status {
            EditStatus::Applied { .. } => {
                eprintln!("{} Applied {}", "✓".green(), request.operation);
                let matches = count_matches(&original, request);
                if matches > 1 {
                    eprintln!(
                        "  {} {matches} elements match the target selector; edited the first",
                        "Note:".yellow()
                    );
                }
            }
            EditStatus::NoMatch { suggestion } => {
                eprintln!("{} No element matched the target selector", "⊘".yellow());
                if let Some(suggestion) = suggestion {
                    eprintln!("  Did you mean #{suggestion}?");
                }
            }
            EditStatus::Failed { reason } => eprintln!("{} Failed: {}", "✗".red(), reason),
        }
        print_report(&outcome.report);
        if let Some(entry) = &outcome.entry {
            eprintln!("  {} {} ({})", "Changelog:".bold(), entry.entry, entry.rollback_id);
        }
    }

    finish(file, &original, &outcome.markup, output)?;

    if !outcome.status.is_applied() {
        std::process::exit(1);
    }
    Ok(())
}

/// How many elements the request's target selector matches in `markup`.
///
/// Edits always take the first match, so anything above one is worth a note.
fn count_matches(markup: &str, request: &EditRequest) -> usize {
    let Some(target) = request.parameters.get("target_selector").and_then(Value::as_str) else {
        return 0;
    };
    match (Selector::parse(target), dom::parse(markup)) {
        (Ok(selector), Ok(doc)) => doc.select_all(&selector).len(),
        _ => 0,
    }
}

fn cmd_run(
    settings: EditorSettings,
    file: &Path,
    script_path: &Path,
    output: OutputOptions,
    changelog: Option<&Path>,
) -> Result<()> {
    let script = load_script_from_path(script_path)?;
    let original = read_document(file)?;
    let history = read_history(changelog)?;

    if !script.meta.name.is_empty() {
        eprintln!("Running {}...", script.meta.name.bold());
    }

    let pipeline = Pipeline::new(settings);
    let run = run_script(&script, &original, &pipeline, &history);

    if let Some(path) = changelog {
        for entry in &run.entries {
            append_jsonl(path, entry)?;
        }
    }

    for (id, step) in &run.steps {
        match step {
            StepResult::Applied { .. } => eprintln!("{} {}: {}", "✓".green(), id, step),
            StepResult::NoMatch { .. } => eprintln!("{} {}: {}", "⊘".yellow(), id, step),
            StepResult::Failed { .. } => eprintln!("{} {}: {}", "✗".red(), id, step),
        }
    }

    let failed = run.steps.len() - run.applied();
    eprintln!();
    eprintln!("{}", "Summary:".bold());
    eprintln!("  {} applied", format!("{}", run.applied()).green());
    eprintln!("  {} not applied", format!("{}", failed).red());

    finish(file, &original, &run.markup, output)?;

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_check(settings: EditorSettings, file: &Path, write: bool, json: bool) -> Result<()> {
    let original = read_document(file)?;
    let report = Pipeline::new(settings)
        .repairer()
        .validate_and_repair(&original, &[]);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.success {
        eprintln!("{} {}", "✓".green(), report.message);
    } else {
        print_report(&report);
    }

    if write && report.repaired_dom != original {
        write_atomic(file, &report.repaired_dom)
            .with_context(|| format!("failed to write {}", file.display()))?;
        eprintln!("Wrote repairs to {}", file.display());
    }

    if !report.success && !write {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_log(settings: EditorSettings, input: &str, voice: bool) -> Result<()> {
    let raw = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read execution log from stdin")?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };

    let log: ExecutionLog = serde_json::from_str(&raw).context("invalid execution log JSON")?;
    let entry = ChangelogRecorder::new()
        .voice_marker(settings.changelog.voice_marker)
        .record(&log, voice);

    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn print_report(report: &RepairReport) {
    if report.success {
        return;
    }
    eprintln!("{}", "Structural issues:".bold());
    for issue in &report.issues {
        match &issue.fix {
            Some(fix) => eprintln!("  {} {} -> {}", "!".yellow(), issue.description, fix),
            None => eprintln!("  {} {}", "✗".red(), issue.description),
        }
    }
}

/// Diff, write or print the final markup.
fn finish(file: &Path, original: &str, modified: &str, output: OutputOptions) -> Result<()> {
    if output.diff {
        display_diff(file, original, modified);
    }

    if output.write {
        if modified != original {
            write_atomic(file, modified)
                .with_context(|| format!("failed to write {}", file.display()))?;
            eprintln!("Wrote {}", file.display());
        }
    } else if !output.diff && !output.json {
        print!("{modified}");
    }
    Ok(())
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (edited)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
