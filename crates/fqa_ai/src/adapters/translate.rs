use std::time::Duration;

use fqa_core::error::AppError;

use crate::http::map_call_error;

pub const TRANSLATION_FAILED: &str = "TRANSLATION_FAILED";

const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, AppError>;
}

/// Language codes look like `hi`, `te`, `pt-BR` or `zh-CN`.
pub fn validate_lang_code(lang: &str) -> Result<(), AppError> {
    let ok = (2..=10).contains(&lang.len())
        && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !lang.starts_with('-');
    if !ok {
        return Err(AppError::new(TRANSLATION_FAILED, "Invalid language code")
            .with_details(format!("lang={lang}")));
    }
    Ok(())
}

/// Best-effort client for the public Google Translate endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    base_url: String,
    timeout: Duration,
}

impl GoogleTranslator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            base_url: GOOGLE_TRANSLATE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

/// The response is a nested array; the first element lists `[translated, original, ...]` segments.
fn parse_segments(v: &serde_json::Value) -> Option<String> {
    let segments = v.get(0)?.as_array()?;
    let mut out = String::new();
    for seg in segments {
        if let Some(s) = seg.get(0).and_then(|s| s.as_str()) {
            out.push_str(s);
        }
    }
    if out.trim().is_empty() {
        None
    } else {
        Some(out)
    }
}

impl Translator for GoogleTranslator {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, AppError> {
        validate_lang_code(target_lang)?;
        let resp = ureq::get(&self.base_url)
            .timeout(self.timeout)
            .query("client", "gtx")
            .query("sl", "auto")
            .query("tl", target_lang)
            .query("dt", "t")
            .query("q", text)
            .call()
            .map_err(|e| map_call_error(TRANSLATION_FAILED, "Failed to call translation service", e))?;

        let v: serde_json::Value = resp.into_json().map_err(|e| {
            AppError::new(TRANSLATION_FAILED, "Failed to decode translation response")
                .with_details(e.to_string())
        })?;
        parse_segments(&v).ok_or_else(|| {
            AppError::new(TRANSLATION_FAILED, "Translation response had no text")
                .with_details(format!("lang={target_lang}"))
        })
    }
}
