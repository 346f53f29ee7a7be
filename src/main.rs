use clap::{Args, Parser, Subcommand};
use pcktool::header::{PckHeader, Version};
use pcktool::index::FileEntry;
use pcktool::pck::{format_size, Pck, PckOptions};
use serde::Serialize;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pck", version, about = "Inspect, extract and build Godot .pck containers")]
struct Cli {
    #[command(flatten)]
    flags: Flags,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Flags {
    /// Overwrite existing files when extracting
    #[arg(short, long, global = true)]
    force: bool,
    /// Extract entries whose checksum does not match
    #[arg(long, global = true)]
    no_skip_broken: bool,
    /// Pack without path and data alignment padding
    #[arg(long, global = true)]
    no_align: bool,
    /// Do not convert project.binary to project.godot on extraction
    #[arg(long, global = true)]
    no_decode: bool,
    /// Engine version stamped into packed containers (major.minor.patch)
    #[arg(long, global = true, value_name = "VERSION", default_value = "3.2.2")]
    engine_version: Version,
    /// Maximum nesting depth when decoding settings values
    #[arg(long, global = true, value_name = "N", default_value_t = pcktool::variant::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Print offsets, checksums, debug logs and error causes
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every entry of a container into a directory
    #[command(visible_alias = "e")]
    Extract {
        pck: PathBuf,
        dir: PathBuf,
    },
    /// Pack the files of a directory into a container
    #[command(visible_alias = "p")]
    Pack {
        dir: PathBuf,
        pck: PathBuf,
    },
    /// List the entries of a container
    #[command(visible_alias = "l")]
    List {
        pck: PathBuf,
        /// Print the header and entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one packed file, by path or index
    #[command(visible_alias = "v")]
    View {
        pck: PathBuf,
        path_or_index: String,
    },
}

#[derive(Serialize)]
struct Listing<'a> {
    header:  &'a PckHeader,
    entries: &'a [FileEntry],
}

impl Flags {
    fn options(&self) -> PckOptions {
        PckOptions {
            force:                   self.force,
            skip_broken:             !self.no_skip_broken,
            align:                   !self.no_align,
            decode_project_settings: !self.no_decode,
            engine_version:          self.engine_version,
            max_decode_depth:        self.max_depth,
            ..PckOptions::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.flags.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if cli.flags.verbose {
                let mut source = e.source();
                while let Some(cause) = source {
                    eprintln!("  caused by: {cause}");
                    source = cause.source();
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let options = cli.flags.options();
    match &cli.command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { pck, dir } => {
            Pck::open(pck, options)?.extract_all(dir)?;
        }

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { dir, pck } => {
            Pck::pack(dir, pck, options)?;
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { pck, json } => {
            let pck = Pck::open(pck, options)?;
            let mut out = io::stdout().lock();
            if *json {
                let listing = Listing { header: pck.header(), entries: pck.entries() };
                serde_json::to_writer_pretty(&mut out, &listing)?;
                writeln!(out)?;
                return Ok(());
            }

            let header = pck.header();
            writeln!(out, "format version: {}", header.format_version)?;
            writeln!(out, "engine version: {}", header.engine_version)?;
            writeln!(out, "Files ({}):", pck.entries().len())?;
            for entry in pck.entries() {
                write!(out, " - {:?} ({})", entry.path, format_size(entry.size))?;
                if entry.broken {
                    write!(out, " (broken)")?;
                }
                writeln!(out)?;
                if cli.flags.verbose {
                    writeln!(out, "    - offset: 0x{:016x}", entry.offset)?;
                    writeln!(out, "    - md5: {}", entry.checksum_hex())?;
                }
            }
        }

        // ── View ─────────────────────────────────────────────────────────────
        Commands::View { pck, path_or_index } => {
            let mut pck = Pck::open(pck, options)?;
            let entry = pck
                .find(path_or_index)
                .cloned()
                .ok_or_else(|| pcktool::PckError::EntryNotFound(path_or_index.clone()))?;
            let data = pck.view_file(path_or_index)?;

            let rule = "-".repeat(50);
            let mut out = io::stdout().lock();
            writeln!(out, "File: {:?} ({})", entry.path, format_size(entry.size))?;
            writeln!(out, "{rule}")?;
            out.write_all(&data)?;
            writeln!(out)?;
            writeln!(out, "{rule}")?;
        }
    }

    Ok(())
}
