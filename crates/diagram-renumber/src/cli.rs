use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::{
    renumber_file, DanglingReference, RenumberOptions, RenumberReport, DEFAULT_CELL_TAG,
    DEFAULT_FIRST_ID,
};

pub const DEFAULT_INPUT: &str = "system_architecture.xml";
pub const DEFAULT_OUTPUT: &str = "system_architecture_fixed.xml";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "diagram-renumber")]
#[command(about = "Renumber draw.io/mxGraph cell ids to sequential integers, keeping references intact.")]
pub struct Args {
    /// Diagram to read. It is never modified.
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Where to write the renumbered diagram (replaced atomically).
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Local name of the elements whose `id`/`parent`/`source`/`target` attributes are rewritten.
    #[arg(long, default_value = DEFAULT_CELL_TAG)]
    cell_tag: String,

    /// First identifier to assign. `0` and `1` belong to the root and default layer.
    #[arg(long, default_value_t = DEFAULT_FIRST_ID, value_parser = clap::value_parser!(u64).range(2..))]
    first_id: u64,

    /// Also write the old -> new identifier table as a JSON object.
    #[arg(long, value_name = "PATH")]
    map_out: Option<PathBuf>,

    /// Summary format printed after a successful run.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Do not print a summary.
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    input: &'a str,
    output: &'a str,
    map_out: Option<&'a str>,
    #[serde(flatten)]
    report: &'a RenumberReport,
}

pub fn run() -> Result<()> {
    init_logging();
    run_with_args(Args::parse())
}

/// Installs the `env_logger` backend; `RUST_LOG` overrides the default `warn` level.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    // A logger may already be installed when embedded in tests.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

pub fn run_with_args(args: Args) -> Result<()> {
    let options = RenumberOptions {
        cell_tag: args.cell_tag.clone(),
        first_id: args.first_id,
    };

    let renumbered = renumber_file(&args.input, &args.output, &options).with_context(|| {
        format!(
            "renumber {} -> {}",
            args.input.display(),
            args.output.display()
        )
    })?;

    if let Some(map_out) = &args.map_out {
        let json = renumbered
            .table
            .to_json()
            .context("serialize identifier table")?;
        crate::fs::write_atomically(map_out, format!("{json}\n").as_bytes())
            .with_context(|| format!("write identifier table to {}", map_out.display()))?;
    }

    if args.quiet {
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let printed = match args.format {
        OutputFormat::Text => print_text(&mut out, &args, &renumbered.report),
        OutputFormat::Json => print_json(&mut out, &args, &renumbered.report),
    };
    match printed {
        // The output file is already written; a closed stdout is not a failure.
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("write summary"),
    }
}

fn print_text(out: &mut impl Write, args: &Args, report: &RenumberReport) -> std::io::Result<()> {
    writeln!(out, "Renumbered diagram")?;
    writeln!(out, "  input:  {}", args.input.display())?;
    writeln!(out, "  output: {}", args.output.display())?;
    if let Some(map_out) = &args.map_out {
        writeln!(out, "  map:    {}", map_out.display())?;
    }
    writeln!(
        out,
        "Summary: cells={} mapped={} duplicates={} rewritten={} dangling={}",
        report.cells,
        report.mapped_ids,
        report.duplicate_ids,
        report.rewritten_attributes,
        report.dangling_references.len()
    )?;
    for dangling in &report.dangling_references {
        writeln!(out, "  dangling: {}", describe_dangling(dangling))?;
    }
    Ok(())
}

fn describe_dangling(dangling: &DanglingReference) -> String {
    match &dangling.cell_id {
        Some(id) => format!("cell {id:?} {}={:?}", dangling.attribute, dangling.value),
        None => format!("cell without id {}={:?}", dangling.attribute, dangling.value),
    }
}

fn print_json(out: &mut impl Write, args: &Args, report: &RenumberReport) -> std::io::Result<()> {
    let input = args.input.to_string_lossy();
    let output = args.output.to_string_lossy();
    let map_out = args.map_out.as_ref().map(|p| p.to_string_lossy());
    let summary = JsonSummary {
        input: &input,
        output: &output,
        map_out: map_out.as_deref(),
        report,
    };
    serde_json::to_writer(&mut *out, &summary)?;
    out.write_all(b"\n")
}
