//! xmledit command line
//!
//! Thin front end over the library: index a file, check files, list units,
//! record patches into a file's journal and save them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xmledit::session::validate_files;
use xmledit::{Config, Patch, PatchKind, Session, StructuralIndexer, UnitId};

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: xmledit::memory::TrackingAllocator = xmledit::memory::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "xmledit", version)]
#[command(about = "Index, patch and save very large XML files without loading them")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the unit index and report structural problems
    Index {
        file: PathBuf,
        /// Slice threshold for oversized units, in bytes
        #[arg(long)]
        max_fragment_size: Option<u64>,
    },
    /// Check well-formedness of one or more files in parallel
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the units of a file
    Units {
        file: PathBuf,
        /// Show at most this many units
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
        /// Print the text of one unit (with pending edits) instead
        #[arg(long, value_name = "ID")]
        show: Option<UnitId>,
    },
    /// Record an edit in the file's journal
    Patch {
        file: PathBuf,
        /// Replace a whole unit (e.g. frag_3)
        #[arg(long, value_name = "ID", conflicts_with_all = ["start", "end"])]
        unit: Option<UnitId>,
        /// Start offset in the original file
        #[arg(long)]
        start: Option<u64>,
        /// End offset in the original file (defaults to start: insert)
        #[arg(long)]
        end: Option<u64>,
        /// Replacement text (empty: delete)
        #[arg(long, default_value = "")]
        text: String,
    },
    /// Apply the journal and write the result
    Save {
        file: PathBuf,
        /// Write here instead of over the original
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Drop the pending edits instead of saving
        #[arg(long, conflicts_with = "output")]
        discard: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("xmledit=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|config| run(cli.command, config));
    report_memory();
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Command, config: Config) -> anyhow::Result<ExitCode> {
    match command {
        Command::Index {
            file,
            max_fragment_size,
        } => index(&file, config, max_fragment_size),
        Command::Check { files } => check(&files, &config),
        Command::Units { file, limit, show } => units(&file, config, limit, show),
        Command::Patch {
            file,
            unit,
            start,
            end,
            text,
        } => patch(&file, config, unit, start, end, text),
        Command::Save {
            file,
            output,
            discard,
        } => save(&file, config, output.as_deref(), discard),
    }
}

fn index(file: &Path, config: Config, max_fragment_size: Option<u64>) -> anyhow::Result<ExitCode> {
    let mut indexer = StructuralIndexer::new(&config);
    if let Some(size) = max_fragment_size {
        indexer = indexer.with_max_fragment_size(size);
    }
    let report = indexer.index_path(file)?;

    let continuations = report.index.iter().filter(|f| f.is_continuation()).count();
    println!(
        "{}: {} fragment(s) ({} continuation) covering {} bytes, {} distinct name(s), {} bytes in {:.1?}",
        file.display(),
        report.index.len(),
        continuations,
        report.index.covered_bytes(),
        report.index.strings().len() - 1,
        report.bytes_scanned,
        report.elapsed
    );
    for record in &report.errors {
        println!("  {record}");
    }
    if !report.completed {
        bail!("indexing aborted after {} bytes", report.bytes_scanned);
    }
    Ok(exit_code(report.error_count() == 0))
}

fn check(files: &[PathBuf], config: &Config) -> anyhow::Result<ExitCode> {
    let mut all_valid = true;
    for (path, result) in validate_files(files, config) {
        match result {
            Ok(report) => {
                println!("{}: {}", path.display(), report.summary());
                for record in &report.errors {
                    println!("  {record}");
                }
                all_valid &= report.success;
            }
            Err(e) => {
                println!("{}: {e}", path.display());
                all_valid = false;
            }
        }
    }
    Ok(exit_code(all_valid))
}

fn units(file: &Path, config: Config, limit: usize, show: Option<UnitId>) -> anyhow::Result<ExitCode> {
    let session = Session::open(file, config)?;
    if let Some(id) = show {
        print!("{}", session.unit_text(id)?);
        return Ok(ExitCode::SUCCESS);
    }

    let index = session.index();
    let patches = session.patch_manager();
    for fragment in index.iter().take(limit) {
        let id = fragment.id();
        let edits = patches.for_unit(id).len();
        println!(
            "{:>10}  <{}>  bytes {}..{}  lines {}-{}  {:?}{}{}",
            id.to_string(),
            index.name_of(fragment).unwrap_or("?"),
            fragment.start,
            fragment.end,
            fragment.start_line,
            fragment.end_line,
            index.status(id),
            if fragment.is_continuation() { "  (continuation)" } else { "" },
            if edits > 0 { format!("  {edits} edit(s)") } else { String::new() },
        );
    }
    if index.len() > limit {
        println!("... {} more", index.len() - limit);
    }
    Ok(ExitCode::SUCCESS)
}

fn patch(
    file: &Path,
    mut config: Config,
    unit: Option<UnitId>,
    start: Option<u64>,
    end: Option<u64>,
    text: String,
) -> anyhow::Result<ExitCode> {
    config.journal = true;
    let session = Session::open(file, config)?;

    let superseded = match (unit, start) {
        (Some(id), _) => session.update_unit(id, text)?,
        (None, Some(start)) => {
            let end = end.unwrap_or(start);
            let kind = if start == end {
                PatchKind::Insert
            } else if text.is_empty() {
                PatchKind::Delete
            } else {
                PatchKind::Replace
            };
            session.add_patch(Patch::new(start, end, text, kind, None)?)?
        }
        (None, None) => bail!("either --unit or --start is required"),
    };

    for old in &superseded {
        println!("superseded: {old}");
    }
    println!("{} pending patch(es)", session.patches().len());
    Ok(ExitCode::SUCCESS)
}

fn save(file: &Path, mut config: Config, output: Option<&Path>, discard: bool) -> anyhow::Result<ExitCode> {
    config.journal = true;
    let session = Session::open(file, config)?;
    if discard {
        let dropped = session.patches().len();
        session.discard_edits()?;
        println!("discarded {dropped} patch(es)");
        return Ok(ExitCode::SUCCESS);
    }
    if !session.has_unsaved() {
        println!("nothing to save");
        return Ok(ExitCode::SUCCESS);
    }

    let pending = session.patches().len();
    let report = session.save(output)?;
    println!(
        "wrote {} bytes to {} ({} patch(es), {:.1?})",
        report.bytes_written,
        report.path.display(),
        pending,
        report.elapsed
    );
    Ok(ExitCode::SUCCESS)
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn report_memory() {
    if cfg!(feature = "memory_tracking") {
        tracing::info!(
            allocated = xmledit::memory::allocated(),
            peak = xmledit::memory::peak(),
            "allocator statistics"
        );
    }
}
