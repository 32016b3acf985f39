//! swaptower CLI - multi-material post-processor front end
//!
//! Usage:
//!   swaptower process <input.gcode> [-o <output.gcode>] [--config swaptower.toml]
//!   swaptower info <input.gcode> [--json]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use swaptower_dialect::{process_file, LayerAction, ProcessConfig, ProcessedPrint};
use swaptower_gcode::{output_path, write_lines};

#[derive(Parser, Debug)]
#[command(name = "swaptower")]
#[command(author, version, about = "Purge tower preparation for multi-material G-code", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Processing configuration file (TOML)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a sliced file and write the result next to it
    Process {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (default: <stem>_fs.<ext> next to the input)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Show detected settings and the tower plan of a sliced file
    Info {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProcessConfig::default(),
    };

    match cli.command {
        Commands::Process { input, output } => run_process(&input, output, &config),
        Commands::Info { input, json } => run_info(&input, json, &config),
    }
}

fn load_config(path: &Path) -> Result<ProcessConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn parse_config(text: &str) -> Result<ProcessConfig> {
    let config: ProcessConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

fn load_print(input: &Path, config: &ProcessConfig) -> Result<ProcessedPrint> {
    process_file(input, config).map_err(|e| {
        let hint = if e.is_configuration_error() {
            " (fix the slicer settings and slice again)"
        } else {
            ""
        };
        anyhow::Error::new(e).context(format!("Failed to process {}{}", input.display(), hint))
    })
}

fn run_process(input: &Path, output: Option<PathBuf>, config: &ProcessConfig) -> Result<()> {
    let print = load_print(input, config)?;
    let output = output.unwrap_or_else(|| output_path(input));

    write_lines(&output, print.lines())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Wrote {}", output.display());
    print_summary(&print);
    Ok(())
}

fn run_info(input: &Path, json: bool, config: &ProcessConfig) -> Result<()> {
    let print = load_print(input, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&print.summary())?);
        return Ok(());
    }

    let header = &print.header;
    println!("File: {}", input.display());
    println!("  Slicer: {}", print.slicer);
    match header.print.version {
        Some(v) => println!("  Version: {}", v),
        None => println!("  Version: unknown"),
    }
    if let Some(machine) = header.machine {
        println!(
            "  Bed: {:?} {:.1} x {:.1} mm (origin offset {:.1}, {:.1})",
            machine.kind,
            machine.stroke_x,
            machine.stroke_y,
            machine.origin_offset_x,
            machine.origin_offset_y
        );
    }
    println!("  Layers: {}", print.layers.len());
    println!("  Tower slots: {}", print.max_slots);
    println!(
        "  Last tool change at: {:.2} mm",
        print.tool_usage.last_switch_height
    );

    println!("\nTools:");
    for tool in header.tools.values() {
        println!(
            "  T{}: {} retract {:.2} mm, z-hop {:.2} mm, wipe {}",
            tool.tool,
            tool.filament_type.as_deref().unwrap_or("?"),
            tool.retract,
            tool.z_hop,
            if tool.wipe.is_some() { "on" } else { "off" }
        );
    }

    let counts = count_actions(&print);
    println!("\nTower layers:");
    println!("  Tool switch: {}", counts[0]);
    println!("  Infill: {}", counts[1]);
    println!("  Pass: {}", counts[2]);

    Ok(())
}

/// Tagged layer counts as `[switch, infill, pass]`.
fn count_actions(print: &ProcessedPrint) -> [usize; 3] {
    let mut counts = [0; 3];
    for layer in print.filtered_layers() {
        match layer.action {
            Some(LayerAction::ToolSwitch) => counts[0] += 1,
            Some(LayerAction::Infill) => counts[1] += 1,
            Some(LayerAction::Pass) => counts[2] += 1,
            None => {}
        }
    }
    counts
}

fn print_summary(print: &ProcessedPrint) {
    info!("G-code successfully processed");
    if print.tool_usage.tools.is_empty() {
        warn!("No tool changes found, nothing for the tower to do");
        return;
    }
    let tools: Vec<String> = print
        .tool_usage
        .tools
        .iter()
        .map(|t| format!("T{}", t))
        .collect();
    info!(
        "Tools used: {}, tower needs {} slot(s) up to {:.2} mm",
        tools.join(", "),
        print.max_slots,
        print.tool_usage.last_switch_height
    );
    info!("Before print: make sure T0 has filament loaded");
}
