use std::io::{BufRead, Write};

use fqa_ai::adapters::{deliver, Speaker, Translator};
use fqa_ai::pipeline::{self, PipelineEvent, PipelineHandle, PipelineState};
use fqa_core::domain::AnswerRecord;
use fqa_core::error::AppError;

const PROMPT: &str = "Your question (or 'exit' to quit): ";
const SEPARATOR_WIDTH: usize = 60;

/// `exit` and `quit` end the session in any letter case.
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Anything that can answer one question. The loop only depends on this.
pub trait Answerer {
    fn answer(&self, question: &str, language_hint: Option<&str>) -> Result<AnswerRecord, AppError>;
}

impl Answerer for PipelineHandle {
    fn answer(&self, question: &str, language_hint: Option<&str>) -> Result<AnswerRecord, AppError> {
        pipeline::answer(self, question, language_hint)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplOptions {
    pub lang: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplExit {
    UserQuit,
    EndOfInput,
    Fatal(AppError),
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::new("IO_FAILED", "Terminal read/write failed").with_details(e.to_string())
}

pub fn write_answer<W: Write>(
    out: &mut W,
    record: &AnswerRecord,
    text: &str,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Answer:")?;
    writeln!(out, "{text}")?;
    if record.truncated {
        writeln!(out, "(some retrieved context did not fit and was left out)")?;
    }
    writeln!(out)?;
    if record.supporting_chunks.is_empty() {
        writeln!(out, "Source(s): none matched")?;
    } else {
        writeln!(out, "Source(s):")?;
        for chunk in &record.supporting_chunks {
            match chunk.page {
                Some(page) => writeln!(out, "-> {} (page {page})", chunk.source_form)?,
                None => writeln!(out, "-> {}", chunk.source_form)?,
            }
        }
    }
    writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
    Ok(())
}

/// Answers one question and prints the result. Returns whether an answer was
/// printed; per-question failures are printed and reported as `Ok(false)`,
/// integrity failures come back as `Err`.
pub fn ask_once<A: Answerer + ?Sized, W: Write>(
    answerer: &A,
    question: &str,
    out: &mut W,
    opts: &ReplOptions,
    translator: Option<&dyn Translator>,
    speaker: Option<&dyn Speaker>,
) -> Result<bool, AppError> {
    match answerer.answer(question, opts.lang.as_deref()) {
        Ok(record) => {
            let delivery = deliver(&record.answer_text, opts.lang.as_deref(), translator, speaker);
            write_answer(out, &record, &delivery.text).map_err(io_error)?;
            Ok(true)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            writeln!(out, "error: {}", e.one_line()).map_err(io_error)?;
            if e.retryable {
                writeln!(out, "(temporary problem; you can ask again)").map_err(io_error)?;
            }
            Ok(false)
        }
    }
}

/// Reads questions line by line until `exit`/`quit`, end of input, or a fatal error.
pub fn run_repl<A: Answerer + ?Sized, R: BufRead, W: Write>(
    answerer: &A,
    mut input: R,
    out: &mut W,
    opts: &ReplOptions,
    translator: Option<&dyn Translator>,
    speaker: Option<&dyn Speaker>,
) -> Result<ReplExit, AppError> {
    let mut state = PipelineState::Ready;
    let mut line = String::new();

    loop {
        write!(out, "{PROMPT}").map_err(io_error)?;
        out.flush().map_err(io_error)?;

        line.clear();
        if input.read_line(&mut line).map_err(io_error)? == 0 {
            writeln!(out).map_err(io_error)?;
            state.apply(PipelineEvent::ShutdownRequested)?;
            return Ok(ReplExit::EndOfInput);
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            state.apply(PipelineEvent::ShutdownRequested)?;
            return Ok(ReplExit::UserQuit);
        }

        state = state.apply(PipelineEvent::QueryStarted)?;
        let outcome = ask_once(answerer, question, out, opts, translator, speaker);
        state = state.apply(PipelineEvent::QueryFinished)?;
        if let Err(e) = outcome {
            if !e.is_fatal() {
                return Err(e);
            }
            state.apply(PipelineEvent::ShutdownRequested)?;
            return Ok(ReplExit::Fatal(e));
        }
    }
}
