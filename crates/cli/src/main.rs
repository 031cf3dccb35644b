// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

use imx23_config::{RegisterScript, ScriptStep};
use imx23_core::system::builder::build_board;
use imx23_core::system::imx23::Imx23Board;

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

fn parse_u32_value(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid value '{}': {}", s, e))
    }
}

fn parse_u64_addr(s: &str) -> Result<u64, String> {
    parse_u32_value(s).map(u64::from)
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "i.MX23 interrupt collector and register window model",
    long_about = None
)]
struct Cli {
    /// Path to the chip descriptor (YAML). Defaults to the built-in i.MX23 map.
    #[arg(short, long, global = true)]
    chip: Option<PathBuf>,

    /// Log every register access
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a register script (YAML) against a freshly reset board.
    Run(RunArgs),

    /// Read one register from a freshly reset board.
    Read(ReadArgs),

    /// Print the reset state of every peripheral as JSON.
    Snapshot(SnapshotArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the register script (YAML)
    script: PathBuf,

    /// Directory to write result.json and snapshot.json
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ReadArgs {
    #[arg(value_parser = parse_u64_addr)]
    address: u64,

    /// Access size in bytes (1, 2 or 4)
    #[arg(long, default_value = "4")]
    size: u32,
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Write the snapshot here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct StepResult {
    step: usize,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunResult {
    result_schema_version: String,
    status: String,
    steps_executed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    checks: Vec<StepResult>,
    script: PathBuf,
    chip: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so register values and snapshots stay pipeable.
    let level = if cli.trace {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(ref args) => run_script(cli.chip.as_deref(), args),
        Commands::Read(ref args) => run_read(cli.chip.as_deref(), args),
        Commands::Snapshot(ref args) => run_snapshot(cli.chip.as_deref(), args),
    }
}

fn run_script(chip_override: Option<&Path>, args: &RunArgs) -> ExitCode {
    let script = match RegisterScript::from_file(&args.script) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let chip_path = chip_override.map(Path::to_path_buf).or_else(|| {
        script
            .chip
            .as_deref()
            .map(|c| resolve_script_path(&args.script, c))
    });
    let mut board = match build_board(chip_path.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut checks = Vec::new();
    let mut steps_executed = 0;
    let mut runtime_error = None;
    for (index, step) in script.steps.iter().enumerate() {
        match execute_step(&mut board, index, step) {
            Ok(Some(check)) => {
                if !check.passed {
                    error!(
                        "Step {} failed: {}",
                        index,
                        check.message.as_deref().unwrap_or("check failed")
                    );
                }
                checks.push(check);
            }
            Ok(None) => {}
            Err(e) => {
                error!("Step {}: {:#}", index, e);
                runtime_error = Some(format!("step {}: {:#}", index, e));
                break;
            }
        }
        steps_executed += 1;
    }

    let failed = checks.iter().filter(|c| !c.passed).count();
    let (status, code) = if runtime_error.is_some() {
        ("error", EXIT_RUNTIME_ERROR)
    } else if failed > 0 {
        ("fail", EXIT_ASSERT_FAIL)
    } else {
        ("pass", EXIT_PASS)
    };
    info!(
        "{}: {} steps, {} checks, {} failed",
        status,
        steps_executed,
        checks.len(),
        failed
    );

    if let Some(output_dir) = &args.output_dir {
        let result = RunResult {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status: status.to_string(),
            steps_executed,
            message: runtime_error,
            checks,
            script: args.script.clone(),
            chip: chip_path,
        };
        if let Err(e) = write_outputs(output_dir, &result, &board) {
            error!("Failed to write outputs to {:?}: {:#}", output_dir, e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    ExitCode::from(code)
}

/// Runs one step. Register reads with an expectation and level checks
/// produce a check result; the other steps only act on the board.
fn execute_step(
    board: &mut Imx23Board,
    index: usize,
    step: &ScriptStep,
) -> anyhow::Result<Option<StepResult>> {
    let check = match step {
        ScriptStep::Write(w) => {
            let w = &w.write;
            board.bus.write_sized(w.address, w.value, w.size)?;
            None
        }
        ScriptStep::Read(r) => {
            let r = &r.read;
            let value = board.bus.read_sized(r.address, r.size)?;
            info!("{:#010x} = {:#010x}", r.address, value);
            r.expect.map(|expected| {
                let mask = r.mask.unwrap_or(u32::MAX);
                let passed = value & mask == expected & mask;
                StepResult {
                    step: index,
                    passed,
                    observed: Some(value),
                    message: (!passed).then(|| {
                        format!(
                            "read {:#x}: expected {:#x} under mask {:#x}, got {:#x}",
                            r.address, expected, mask, value
                        )
                    }),
                }
            })
        }
        ScriptStep::SetLine(l) => {
            board.set_line(l.set_line.line as usize, l.set_line.level)?;
            None
        }
        ScriptStep::ExpectIrq(e) => {
            Some(level_check(index, "irq", board.irq.is_high(), e.expect_irq))
        }
        ScriptStep::ExpectFiq(e) => {
            Some(level_check(index, "fiq", board.fiq.is_high(), e.expect_fiq))
        }
    };
    Ok(check)
}

fn level_check(step: usize, name: &str, level: bool, expected: bool) -> StepResult {
    let passed = level == expected;
    StepResult {
        step,
        passed,
        observed: Some(level as u32),
        message: (!passed).then(|| format!("{} expected {}, got {}", name, expected, level)),
    }
}

fn write_outputs(output_dir: &Path, result: &RunResult, board: &Imx23Board) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let f = std::fs::File::create(output_dir.join("result.json"))?;
    serde_json::to_writer_pretty(f, result)?;
    let f = std::fs::File::create(output_dir.join("snapshot.json"))?;
    serde_json::to_writer_pretty(f, &board.bus.snapshot())?;
    Ok(())
}

fn run_read(chip: Option<&Path>, args: &ReadArgs) -> ExitCode {
    let board = match build_board(chip) {
        Ok(b) => b,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    match board.bus.read_sized(args.address, args.size) {
        Ok(value) => {
            println!("{:#010x}", value);
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run_snapshot(chip: Option<&Path>, args: &SnapshotArgs) -> ExitCode {
    let board = match build_board(chip) {
        Ok(b) => b,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let snapshot = board.bus.snapshot();
    let written = match &args.output {
        Some(path) => std::fs::File::create(path)
            .map_err(anyhow::Error::from)
            .and_then(|f| Ok(serde_json::to_writer_pretty(f, &snapshot)?)),
        None => serde_json::to_string_pretty(&snapshot)
            .map(|s| println!("{}", s))
            .map_err(anyhow::Error::from),
    };
    match written {
        Ok(()) => ExitCode::from(EXIT_PASS),
        Err(e) => {
            error!("Failed to write snapshot: {:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn resolve_script_path(script_path: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_absolute() {
        return p;
    }
    script_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(p)
}
