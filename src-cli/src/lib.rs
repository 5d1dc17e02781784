use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use fqa_ai::adapters::{EspeakSpeaker, GoogleTranslator, Speaker, Translator};
use fqa_ai::build::{build_index, IndexBuildInput};
use fqa_ai::embeddings::OllamaEmbedder;
use fqa_ai::index::VectorIndex;
use fqa_ai::ollama::OllamaClient;
use fqa_ai::pipeline::{initialize, PipelineEvent, PipelineState};
use fqa_core::error::AppError;
use fqa_core::forms::read_corpus_file;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod repl;

use cli::{AskArgs, BuildArgs, Cli, Command, PipelineArgs};
use repl::{ask_once, run_repl, ReplExit, ReplOptions};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,formqa_lib=debug,fqa_ai=debug,fqa_core=debug"
    } else {
        "warn,formqa_lib=info,fqa_ai=info,fqa_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Some(Command::Ask(args)) => cmd_ask(&args),
        Some(Command::Build(args)) => cmd_build(&args),
        Some(Command::Status(args)) => cmd_status(&args),
        None => cmd_ask(&cli.ask),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(code = %e.code, "command failed");
            eprintln!("error: {}", e.one_line());
            ExitCode::FAILURE
        }
    }
}

fn cmd_ask(args: &AskArgs) -> Result<ExitCode, AppError> {
    let config = args.to_config();

    let state = PipelineState::Uninitialized.apply(PipelineEvent::InitStarted)?;
    let handle = match initialize(&config) {
        Ok(h) => h,
        Err(e) => {
            state.apply(PipelineEvent::InitFailed)?;
            return Err(e);
        }
    };
    let state = state.apply(PipelineEvent::InitSucceeded)?;
    tracing::info!(
        index_dir = %handle.index_dir().display(),
        chunks = handle.chunk_count(),
        dims = handle.dims(),
        "pipeline ready"
    );

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let translator = args.lang.as_ref().map(|_| GoogleTranslator::new(timeout));
    let speaker = args.speak.then(EspeakSpeaker::default);
    let translator = translator.as_ref().map(|t| t as &dyn Translator);
    let speaker = speaker.as_ref().map(|s| s as &dyn Speaker);
    let opts = ReplOptions {
        lang: args.lang.clone(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(question) = args.question.as_deref() {
        let state = state.apply(PipelineEvent::QueryStarted)?;
        let answered = ask_once(&handle, question, &mut out, &opts, translator, speaker);
        state
            .apply(PipelineEvent::QueryFinished)?
            .apply(PipelineEvent::ShutdownRequested)?;
        return Ok(if answered? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let _ = writeln!(out, "Ask anything about your forms. Type 'exit' or 'quit' to leave.");
    let stdin = io::stdin();
    match run_repl(&handle, stdin.lock(), &mut out, &opts, translator, speaker)? {
        ReplExit::UserQuit | ReplExit::EndOfInput => {
            let _ = writeln!(out, "Goodbye!");
            Ok(ExitCode::SUCCESS)
        }
        ReplExit::Fatal(e) => Err(e),
    }
}

fn cmd_build(args: &BuildArgs) -> Result<ExitCode, AppError> {
    let forms = read_corpus_file(&args.forms)?;
    let client = embedding_client(&args.pipeline)?;
    client.health_check()?;
    let embedder = OllamaEmbedder::new(client);

    let summary = build_index(
        &forms,
        &args.pipeline.index_dir,
        &embedder,
        &IndexBuildInput {
            model: args.pipeline.embed_model.clone(),
            max_chunk_chars: args.max_chunk_chars,
        },
    )?;

    println!(
        "Indexed {} form page(s) into {} chunk(s) ({} dims, model {}) at {}",
        summary.forms,
        summary.chunks,
        summary.manifest.dims,
        summary.manifest.model,
        args.pipeline.index_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_status(args: &PipelineArgs) -> Result<ExitCode, AppError> {
    let manifest = VectorIndex::read_manifest(&args.index_dir)?;
    let json = serde_json::to_string_pretty(&manifest).map_err(|e| {
        AppError::new("STATUS_FAILED", "Failed to render index manifest").with_details(e.to_string())
    })?;
    println!("{json}");

    let health = embedding_client(args).and_then(|c| c.health_check());
    match health {
        Ok(()) => println!("embedding service: ok ({})", args.embed_url),
        Err(e) => println!("embedding service: unavailable ({})", e.one_line()),
    }
    if manifest.model != args.embed_model {
        println!(
            "warning: index was built with model {} but {} is configured",
            manifest.model, args.embed_model
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn embedding_client(args: &PipelineArgs) -> Result<OllamaClient, AppError> {
    Ok(OllamaClient::new(&args.embed_url)?.with_timeout(Duration::from_secs(args.timeout_secs)))
}
