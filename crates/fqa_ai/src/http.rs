use std::time::Duration;

use fqa_core::error::AppError;

/// Maps a ureq failure onto `code`. Transport errors, 429 and 5xx are retryable.
pub(crate) fn map_call_error(code: &str, message: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            AppError::new(code, message)
                .with_details(format!("status={status}; body={}", clip(&body, 300)))
                .with_retryable(status == 429 || status >= 500)
        }
        ureq::Error::Transport(t) => AppError::new(code, message)
            .with_details(t.to_string())
            .with_retryable(true),
    }
}

pub(crate) fn clip(s: &str, max_chars: usize) -> String {
    let t = s.trim();
    match t.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &t[..idx]),
        None => t.to_string(),
    }
}

pub(crate) fn timeout_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}
