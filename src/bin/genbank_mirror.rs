use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use genbank_mirror::app::{App, RunOptions, RunSummary};
use genbank_mirror::domain::SpeciesScope;
use genbank_mirror::error::SyncError;
use genbank_mirror::layout::MirrorLayout;
use genbank_mirror::output::{JsonOutput, OutputMode};
use genbank_mirror::remote::HttpRemoteSource;

#[derive(Parser)]
#[command(name = "genbank-mirror")]
#[command(about = "Sync a local mirror with GenBank's bacteria assemblies and organize them in a sane way")]
#[command(version, author)]
struct Cli {
    /// Directory to mirror genomes into
    mirror: String,

    /// Explicit list of organisms to sync, exactly matching directory names
    /// at the remote (e.g. Escherichia_coli)
    #[arg(short, long, num_args = 1.., conflicts_with_all = ["from_file", "genus"])]
    species: Option<Vec<String>>,

    /// File with one organism name per line
    #[arg(short, long, conflicts_with = "genus")]
    from_file: Option<PathBuf>,

    /// Sync every species of one or more genera (e.g. Clostridium)
    #[arg(short, long, num_args = 1..)]
    genus: Option<Vec<String>>,

    /// Use the local copy of assembly_summary.txt instead of re-fetching it
    #[arg(long)]
    use_local: bool,

    /// Apply changes; without this the run only assesses and reports
    #[arg(short, long)]
    update: bool,

    /// After the run, check renamed files against their fasta headers
    /// (diagnostic only)
    #[arg(long)]
    check_names: bool,

    /// Emit the run summary as JSON on stdout
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::CatalogMissing(_)
        | SyncError::CatalogParse(_)
        | SyncError::SpeciesListRead(_) => 2,
        SyncError::RemoteHttp(_)
        | SyncError::RemoteStatus { .. }
        | SyncError::TransientTransfer(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let scope = resolve_scope(&cli).into_diagnostic()?;
    let layout = MirrorLayout::new(Utf8PathBuf::from(cli.mirror));
    let remote = HttpRemoteSource::new().into_diagnostic()?;
    let app = App::new(layout, remote);

    let options = RunOptions {
        fetch_catalog: !cli.use_local,
        update: cli.update,
    };
    let summary = app.run(&scope, options).into_diagnostic()?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_summary(&summary).into_diagnostic()?,
        OutputMode::Interactive => print_summary(&summary),
    }

    if cli.check_names {
        let report = app.check_names().into_diagnostic()?;
        println!(
            "name check: {} correct, {} case mismatches, {} misnamed, {} missing from summary",
            report.correctly_named.len(),
            report.case_mismatch.len(),
            report.misnamed.len(),
            report.missing_from_catalog.len()
        );
    }
    Ok(())
}

fn resolve_scope(cli: &Cli) -> Result<SpeciesScope, SyncError> {
    if let Some(names) = &cli.species {
        Ok(SpeciesScope::from_list(names.clone()))
    } else if let Some(path) = &cli.from_file {
        SpeciesScope::from_file(path)
    } else if let Some(prefixes) = &cli.genus {
        Ok(SpeciesScope::Genus(prefixes.clone()))
    } else {
        Ok(SpeciesScope::All)
    }
}

fn print_summary(summary: &RunSummary) {
    let cyan = "\x1b[36m";
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let reset = "\x1b[0m";

    println!("{cyan}genbank-mirror summary{reset}");
    println!(
        "{green}present: {}  missing: {}  stale: {}{reset}",
        summary.assess.present, summary.assess.missing, summary.assess.stale
    );
    println!(
        "sketches present: {}  sketches missing: {}",
        summary.assess.sketches_present, summary.assess.sketches_missing
    );

    let Some(sync) = &summary.sync else {
        println!("{yellow}assessment only; re-run with --update to apply changes{reset}");
        return;
    };
    println!(
        "{green}updated {} organisms: {} fetched, {} already present, {} unpacked, {} renamed{reset}",
        sync.updated, sync.fetched, sync.already_present, sync.unpacked, sync.renamed
    );
    if summary.pruned > 0 {
        println!("{yellow}removed {} stale genome files{reset}", summary.pruned);
    }
    for skipped in &sync.skipped {
        println!("{yellow}skipped {}: {}{reset}", skipped.organism, skipped.reason);
    }
    if sync.rename_conflicts > 0 || sync.decompression_failures > 0 {
        println!(
            "{yellow}{} rename conflicts, {} decompression failures{reset}",
            sync.rename_conflicts, sync.decompression_failures
        );
    }
}
