// src/cli.rs
use std::{
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};

use crate::{
    config::{consts::CONFIG_PATH, IniSettings, Settings, SettingsProvider},
    core::HttpFetcher,
    csv::records_to_string,
    file::CsvStore,
    publish::GitPublisher,
    record::{MonitoringRecord, HEADERS},
    runner::{ManualTrigger, RunOutcome, Runner},
    schedule::{CancelToken, Scheduler},
    sink::LogBuffer,
    specs,
};

#[derive(Parser, Debug)]
#[command(name = "rad_scrape", version)]
#[command(about = "Daily scraper for the national radiation monitoring list")]
pub struct Cli {
    /// Settings file; written with defaults if missing
    #[arg(long, short, global = true, default_value = CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run on the daily schedule until Ctrl-C (default)
    Daemon,

    /// One run now; non-zero exit if it fails
    Once,

    /// Extract records from a saved page
    Parse {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Show the effective settings
    Config {
        /// Only write the default file if there is none
        #[arg(long)]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Table,
    Csv,
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command.unwrap_or(Command::Daemon) {
        Command::Daemon => daemon(&cli.config),
        Command::Once => once(&cli.config),
        Command::Parse { file, format } => parse_file(&file, format),
        Command::Config { init } => show_config(&cli.config, init),
    }
}

struct Wiring {
    settings: Arc<IniSettings>,
    sink: Arc<LogBuffer>,
    runner: Arc<Runner>,
}

/// TLS verification and the output directory are fixed for the life of the
/// process; everything else is re-read per run.
fn wire(config: &Path, cancel: &CancelToken) -> Result<Wiring> {
    let settings = Arc::new(IniSettings::new(config));
    let first: Settings = settings.snapshot().wrap_err("loading settings")?;

    let sink = Arc::new(LogBuffer::new(first.logging.max_log_lines, cancel.clone()).with_echo(true));
    let fetcher = HttpFetcher::new(first.scraping.verify_tls).wrap_err("building HTTP client")?;
    let workdir = env::current_dir().wrap_err("resolving working directory")?;

    let runner = Runner::new(
        settings.clone(),
        Arc::new(fetcher),
        Arc::new(CsvStore::new(first.scraping.output_dir.clone())),
        Arc::new(GitPublisher::new(workdir)),
        sink.clone(),
    );
    Ok(Wiring { settings, sink, runner: Arc::new(runner) })
}

fn daemon(config: &Path) -> Result<ExitCode> {
    let cancel = CancelToken::new();
    let w = wire(config, &cancel)?;

    let handle = Scheduler::new(w.runner, w.settings, w.sink, cancel.clone())
        .spawn()
        .wrap_err("starting scheduler")?;

    let on_signal = cancel.clone();
    ctrlc::set_handler(move || on_signal.cancel()).wrap_err("installing Ctrl-C handler")?;

    handle.join().map_err(|_| eyre!("scheduler thread panicked"))?;
    logf!("Daemon: shut down");
    Ok(ExitCode::SUCCESS)
}

fn once(config: &Path) -> Result<ExitCode> {
    let cancel = CancelToken::new();
    let w = wire(config, &cancel)?;

    let worker = ManualTrigger::new(w.runner, cancel).trigger()?;
    let outcome = worker.join().map_err(|_| eyre!("manual run thread panicked"))?;
    Ok(match outcome {
        RunOutcome::Completed(summary) => {
            logd!("Once: {} records at {}", summary.records, summary.location.display());
            ExitCode::SUCCESS
        }
        RunOutcome::Failed(_) => ExitCode::FAILURE,
    })
}

fn parse_file(file: &Path, format: Format) -> Result<ExitCode> {
    let bytes = fs::read(file).wrap_err_with(|| format!("reading {}", file.display()))?;
    let content = String::from_utf8_lossy(&bytes);
    let records = specs::parse(&content);
    if records.is_empty() {
        eprintln!("No monitoring records found in {}", file.display());
        return Ok(ExitCode::FAILURE);
    }
    match format {
        Format::Table => print!("{}", render_table(&records)),
        Format::Csv => print!("{}", records_to_string(&records).wrap_err("formatting CSV")?),
    }
    Ok(ExitCode::SUCCESS)
}

fn show_config(config: &Path, init: bool) -> Result<ExitCode> {
    let settings = IniSettings::new(config);
    if init {
        let wrote = settings.ensure_default_file()?;
        if wrote {
            println!("Wrote default settings to {}", settings.path().display());
        } else {
            println!("{} already exists, left untouched", settings.path().display());
        }
        return Ok(ExitCode::SUCCESS);
    }
    let snapshot = settings.snapshot()?;
    println!("# {}", settings.path().display());
    println!("{snapshot}");
    Ok(ExitCode::SUCCESS)
}

/* ---------------- Table ---------------- */

/// Terminal columns taken by `c`; CJK and fullwidth forms take two.
fn char_width(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6 => 2,
        _ => 1,
    }
}

fn text_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(text_width(s));
    join!(s, &" ".repeat(fill))
}

/// Left-aligned columns, two spaces apart, with a rule under the header.
pub fn render_table(records: &[MonitoringRecord]) -> String {
    let mut widths = HEADERS.map(text_width);
    for r in records {
        for (w, cell) in widths.iter_mut().zip(r.to_row()) {
            *w = (*w).max(text_width(cell));
        }
    }

    let line = |cells: [&str; 4]| {
        let padded: Vec<String> = cells.iter().zip(widths).map(|(c, w)| pad(c, w)).collect();
        join!(padded.join("  ").trim_end(), "\n")
    };

    let mut out = line(HEADERS);
    let total = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    out.push_str(&"-".repeat(total));
    out.push('\n');
    for r in records {
        out.push_str(&line(r.to_row()));
    }
    out.push_str(&format!("{} stations\n", records.len()));
    out
}
