use std::io::Write;
use std::process::{Command, Stdio};

use fqa_core::error::AppError;

pub const SPEECH_FAILED: &str = "SPEECH_FAILED";
pub const DEFAULT_SPEECH_RATE: u32 = 160;

pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str, lang: &str) -> Result<(), AppError>;
}

/// Renders speech with the `espeak` binary. Text goes over stdin, never through a shell.
#[derive(Debug, Clone)]
pub struct EspeakSpeaker {
    binary: String,
    rate: u32,
}

impl Default for EspeakSpeaker {
    fn default() -> Self {
        Self {
            binary: "espeak".to_string(),
            rate: DEFAULT_SPEECH_RATE,
        }
    }
}

impl EspeakSpeaker {
    pub fn new(binary: impl Into<String>, rate: u32) -> Self {
        Self {
            binary: binary.into(),
            rate,
        }
    }

    fn args(&self, lang: &str) -> Vec<String> {
        vec![
            "-v".to_string(),
            lang.to_string(),
            "-s".to_string(),
            self.rate.to_string(),
            "--stdin".to_string(),
        ]
    }
}

impl Speaker for EspeakSpeaker {
    fn speak(&self, text: &str, lang: &str) -> Result<(), AppError> {
        super::translate::validate_lang_code(lang).map_err(|e| {
            AppError::new(SPEECH_FAILED, "Invalid speech language").with_cause(e)
        })?;

        let mut child = Command::new(&self.binary)
            .args(self.args(lang))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::new(SPEECH_FAILED, "Failed to start speech engine")
                    .with_details(format!("binary={}; err={}", self.binary, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                // Reap the child so a failed write never leaves a zombie behind.
                drop(stdin);
                let _ = child.kill();
                let status = child.wait();
                return Err(AppError::new(SPEECH_FAILED, "Failed to send text to speech engine")
                    .with_details(format!("err={e}; status={status:?}")));
            }
        }

        let out = child.wait_with_output().map_err(|e| {
            AppError::new(SPEECH_FAILED, "Speech engine did not finish")
                .with_details(e.to_string())
        })?;
        if !out.status.success() {
            return Err(AppError::new(SPEECH_FAILED, "Speech engine exited with an error")
                .with_details(format!(
                    "status={}; stderr={}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_argument_vector_without_text() {
        let s = EspeakSpeaker::default();
        assert_eq!(s.args("hi"), vec!["-v", "hi", "-s", "160", "--stdin"]);
    }

    #[cfg(unix)]
    #[test]
    fn engine_that_exits_early_is_reaped_and_reported() {
        // `true` ignores its arguments and exits without reading stdin, so a
        // large write hits a closed pipe.
        let s = EspeakSpeaker::new("true", 160);
        let text = "a".repeat(4 * 1024 * 1024);
        let err = s.speak(&text, "en").unwrap_err();
        assert_eq!(err.code, SPEECH_FAILED);
        assert_eq!(err.message, "Failed to send text to speech engine");
        assert!(err.details.unwrap().contains("status=Ok("));
    }

    #[test]
    fn missing_binary_is_an_error_not_a_panic() {
        let s = EspeakSpeaker::new("definitely-not-a-speech-engine-binary", 160);
        let err = s.speak("hello", "en").unwrap_err();
        assert_eq!(err.code, SPEECH_FAILED);
    }
}
