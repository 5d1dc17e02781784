//! Best-effort output adapters applied by the caller after an answer is ready.
//! Failures here are logged and never turn into pipeline errors.

pub mod speech;
pub mod translate;

pub use speech::{EspeakSpeaker, Speaker};
pub use translate::{GoogleTranslator, Translator};

pub const SOURCE_LANG: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub text: String,
    pub lang: String,
    pub translated: bool,
    pub spoken: bool,
}

/// Translation is skipped for English or when no language is requested.
pub fn translate_or_original(translator: &dyn Translator, text: &str, lang: Option<&str>) -> (String, bool) {
    let Some(lang) = lang.map(str::trim).filter(|l| !l.is_empty()) else {
        return (text.to_string(), false);
    };
    if lang.eq_ignore_ascii_case(SOURCE_LANG) {
        return (text.to_string(), false);
    }
    match translator.translate(text, lang) {
        Ok(t) => (t, true),
        Err(e) => {
            tracing::warn!(lang, error = %e.one_line(), "translation failed; using original text");
            (text.to_string(), false)
        }
    }
}

pub fn deliver(
    answer_text: &str,
    lang: Option<&str>,
    translator: Option<&dyn Translator>,
    speaker: Option<&dyn Speaker>,
) -> Delivery {
    let (text, translated) = match translator {
        Some(t) => translate_or_original(t, answer_text, lang),
        None => (answer_text.to_string(), false),
    };
    let lang = if translated {
        lang.map(|l| l.trim().to_string()).unwrap_or_else(|| SOURCE_LANG.to_string())
    } else {
        SOURCE_LANG.to_string()
    };

    let spoken = match speaker {
        Some(s) => match s.speak(&text, &lang) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(lang = %lang, error = %e.one_line(), "speech failed; skipping audio");
                false
            }
        },
        None => false,
    };

    Delivery {
        text,
        lang,
        translated,
        spoken,
    }
}
