use std::time::Duration;

use fqa_core::error::AppError;

/// Client settings for a local Ollama server hosting the embedding model.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for Ollama. This is strictly limited to `127.0.0.1`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let rest = if base_url == "http://127.0.0.1" {
            None
        } else if let Some(rest) = base_url.strip_prefix("http://127.0.0.1:") {
            Some(rest)
        } else {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "Embedding service URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        };

        // Only a bare, non-zero port may follow the host.
        if let Some(port) = rest {
            let ok = port.parse::<u16>().map(|p| p != 0).unwrap_or(false);
            if !ok {
                return Err(AppError::new(
                    "CONFIG_INVALID",
                    "Embedding service URL has an invalid port",
                )
                .with_details(format!("base_url={base_url}")));
            }
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(fqa_core::config::DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(Duration::from_millis(800))
            .call();

        match resp {
            Ok(_) => Ok(()),
            Err(e) => Err(crate::http::map_call_error(
                "EMBEDDING_SERVICE_UNREACHABLE",
                "Failed to reach the embedding service on 127.0.0.1",
                e,
            )),
        }
    }
}
