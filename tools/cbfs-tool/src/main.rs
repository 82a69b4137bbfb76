use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use cbfs::{DevMem, FileTable, OutputSink, PhysicalMemory, RomImage, Selection, TOP_OF_SPACE};
use clap::error::ErrorKind;
use clap::{ArgAction, ArgGroup, CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cbfs",
    about = "List or export files from the coreboot file system (CBFS) in the boot ROM.",
    override_usage = "sudo cbfs [options]",
    disable_help_flag = true
)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .multiple(true)
        .args(["read", "list"])
))]
struct Cli {
    /// Increase verbosity (repeat for cursor arithmetic)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Export a CBFS file to stdout
    #[arg(short, long, value_name = "FILE")]
    read: Option<String>,

    /// List the names of CBFS files
    #[arg(short, long)]
    list: bool,

    /// Filter to specific CBFS file type (hex, e.g. 50)
    #[arg(short = 't', long = "type", value_name = "HEX", value_parser = parse_hex_u32)]
    file_type: Option<u32>,

    /// Use a local ROM image instead of physical memory
    #[arg(short = 'o', long, value_name = "ROM")]
    rom: Option<PathBuf>,

    /// This help
    #[arg(short = 'h', long, short_alias = '?', action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn selection(&self) -> Selection {
        Selection {
            list: self.list,
            read: self.read.clone(),
            file_type: self.file_type,
        }
    }
}

fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{s}': {e}"))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            eprint!("{}", err.render());
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprint!("{}", err.render());
            eprintln!();
            eprint!("{}", Cli::command().render_help());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cbfs: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let selection = cli.selection();
    match &cli.rom {
        Some(path) => {
            let rom = RomImage::open(path)?;
            tracing::debug!(
                "ROM image {} mapped at 0x{:x}..0x{TOP_OF_SPACE:x}",
                path.display(),
                rom.base()
            );
            scan(&rom, &selection)
        }
        None => {
            let mem = DevMem::open().context("physical memory access (are you root?)")?;
            scan(&mem, &selection)
        }
    }
}

fn scan<M: PhysicalMemory>(mem: &M, selection: &Selection) -> anyhow::Result<()> {
    let table = FileTable::locate(mem, TOP_OF_SPACE)?;

    let stdout = io::stdout();
    let mut sink = OutputSink::new(stdout.lock());
    let summary = cbfs::run(&table, selection, &mut sink)?;

    tracing::debug!(
        "scanned {} file(s), listed {}, extracted {:?}",
        summary.scanned,
        summary.listed,
        summary.extracted
    );
    Ok(())
}
