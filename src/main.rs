use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use artefact::application::CarveSession;
use artefact::domain::entities::CarvedArtifact;
use artefact::domain::repositories::{ArtifactSink, ByteSource, SinkError};
use artefact::domain::services::{EntropyEndPredictor, SignatureRegistry};
use artefact::infrastructure::persistence::{DirectorySink, JsonCheckpointStore};
use artefact::infrastructure::sources::{FileSource, MmapSource};
use artefact::presentation::cli::{CarveArgs, Cli, Commands, ProgressReporter};
use artefact::utils::format_bytes;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let result = match &cli.command {
        Commands::Carve(args) => run_carve(args),
        Commands::ListFormats => {
            list_formats();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_carve(args: &CarveArgs) -> Result<()> {
    let options = args.to_options()?;

    let source: Arc<dyn ByteSource> = if args.mmap {
        Arc::new(MmapSource::open(&args.input).context(format!("Failed to open {:?}", args.input))?)
    } else {
        Arc::new(FileSource::open(&args.input).context(format!("Failed to open {:?}", args.input))?)
    };
    let input_size = source.len();

    let resume_path = options.resume_path.clone();
    let mut session = CarveSession::new(source, options);
    if let Some(path) = resume_path {
        session = session.with_checkpoint_store(JsonCheckpointStore::new(path));
    }
    if args.entropy_predictor {
        session = session.with_predictor(Arc::new(EntropyEndPredictor::default()));
    }

    let token = session.cancel_token();
    ctrlc::set_handler(move || token.cancel()).context("Failed to install Ctrl-C handler")?;

    let mut sink: Box<dyn ArtifactSink> = if args.dry_run {
        Box::new(|_: CarvedArtifact| -> Result<(), SinkError> { Ok(()) })
    } else {
        Box::new(DirectorySink::new(&args.output)?)
    };

    println!();
    println!("Input:  {:?} ({})", args.input, format_bytes(input_size));
    if args.dry_run {
        println!("Output: none (dry run)");
    } else {
        println!("Output: {:?}", args.output);
    }
    println!();

    let reporter = ProgressReporter::for_carve(input_size);
    let summary = session.run_with_progress(sink.as_mut(), Some(reporter.carve_callback()))?;
    reporter.finish(&format!("Carved {} files", summary.total_carved()));

    println!();
    print!("{}", summary.render());
    Ok(())
}

fn list_formats() {
    println!("{:<5} {:<26} {:<26} {:>10}  Description", "Id", "Header", "End", "Max size");
    for signature in SignatureRegistry::builtin().all() {
        let end = match signature.footer() {
            Some(footer) if signature.strategy().uses_footer() => hex::encode_upper(footer),
            _ => signature.strategy().to_string(),
        };
        println!(
            "{:<5} {:<26} {:<26} {:>10}  {}",
            signature.id(),
            hex::encode_upper(signature.header()),
            end,
            format_bytes(signature.max_size()),
            signature.description()
        );
    }
}
