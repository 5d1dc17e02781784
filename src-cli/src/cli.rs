use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fqa_core::config::{
    PipelineConfig, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_BASE_URL, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_INDEX_DIR, DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
};
use fqa_core::forms::DEFAULT_MAX_CHUNK_CHARS;

#[derive(Parser, Debug)]
#[command(
    name = "formqa",
    version,
    about = "Ask questions about your forms, answered from the indexed form text",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Arguments for the default `ask` command
    #[command(flatten)]
    pub ask: AskArgs,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the question loop (default), or answer one question
    Ask(AskArgs),
    /// Chunk, embed and index a structured forms corpus
    Build(BuildArgs),
    /// Show the persisted index manifest and embedding service health
    Status(PipelineArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Directory holding the vector index and document store
    #[arg(long, env = "FORMQA_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
    pub index_dir: PathBuf,

    /// Embedding model identifier served by the local embedding service
    #[arg(long, env = "FORMQA_EMBED_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embed_model: String,

    /// Base URL of the local embedding service
    #[arg(long, env = "FORMQA_EMBED_URL", default_value = DEFAULT_EMBEDDING_BASE_URL)]
    pub embed_url: String,

    /// Timeout for every embedding / generation request, in seconds
    #[arg(long, env = "FORMQA_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// OpenAI API key for the answering model
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat model used for answer synthesis
    #[arg(long, env = "FORMQA_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "FORMQA_OPENAI_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_url: String,

    /// Number of chunks retrieved per question
    #[arg(long, env = "FORMQA_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: u32,

    /// Sampling temperature for the answer model
    #[arg(long, env = "FORMQA_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Character budget for context included in the prompt
    #[arg(long, env = "FORMQA_MAX_CONTEXT_CHARS", default_value_t = DEFAULT_MAX_CONTEXT_CHARS)]
    pub max_context_chars: usize,

    /// Translate answers into this language (e.g. hi, te, ta)
    #[arg(long)]
    pub lang: Option<String>,

    /// Read answers aloud with espeak
    #[arg(long, default_value_t = false)]
    pub speak: bool,

    /// Answer a single question and exit instead of starting the loop
    #[arg(long, short)]
    pub question: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Preprocessed forms corpus (structured_forms.json)
    #[arg(long, default_value = "structured_forms.json")]
    pub forms: PathBuf,

    /// Maximum characters per chunk
    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
    pub max_chunk_chars: usize,
}

impl AskArgs {
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            openai_api_key: self.openai_api_key.clone(),
            index_dir: self.pipeline.index_dir.clone(),
            embedding_model: self.pipeline.embed_model.clone(),
            embedding_base_url: self.pipeline.embed_url.clone(),
            chat_model: self.chat_model.clone(),
            openai_base_url: self.openai_url.clone(),
            top_k: self.top_k,
            temperature: self.temperature,
            max_context_chars: self.max_context_chars,
            request_timeout_secs: self.pipeline.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_means_ask() {
        let cli = Cli::try_parse_from(["formqa", "--lang", "hi", "--top-k", "5"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.ask.lang.as_deref(), Some("hi"));
        assert_eq!(cli.ask.to_config().top_k, 5);
    }

    #[test]
    fn build_subcommand_parses() {
        let cli = Cli::try_parse_from(["formqa", "build", "--forms", "f.json", "--index-dir", "db"]).unwrap();
        match cli.command {
            Some(Command::Build(b)) => {
                assert_eq!(b.forms, PathBuf::from("f.json"));
                assert_eq!(b.pipeline.index_dir, PathBuf::from("db"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
