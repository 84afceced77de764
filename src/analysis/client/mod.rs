#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::model::{
    AnalysisOptions, AnalysisRequest, AnalysisResult, ErrorResponse, HealthStatus,
    MessageResponse, SimilarityRequest, WordLookup, WordSimilarity,
};
use crate::config::ServiceConfig;

/// Largest text the service accepts
pub const MAX_TEXT_BYTES: usize = 5 * 1024 * 1024;

/// File extensions the service accepts for uploads
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "text", "log", "md", "json", "csv"];

// Responses carry one embedding per vocabulary word and get large quickly.
const MAX_RESPONSE_BYTES: u64 = 256 * 1024 * 1024;

/// Failures talking to the analysis service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with a non-success status; `message` is its error text
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to reach analysis service: {0}")]
    Transport(String),

    #[error("Invalid response from analysis service: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    InvalidInput(String),
}

/// A text together with the analysis the service returned for it
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedText {
    pub text: String,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone)]
pub struct AnalysisClient {
    base_url: Url,
    agent: ureq::Agent,
    options: AnalysisOptions,
}

impl AnalysisClient {
    #[inline]
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        config
            .validate()
            .context("Invalid analysis service configuration")?;
        let base_url = config
            .service_url()
            .context("Failed to generate service URL from config")?;

        Ok(Self {
            base_url,
            agent: build_agent(config.timeout()),
            options: AnalysisOptions {
                include_embeddings: config.include_embeddings,
            },
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub const fn with_embeddings(mut self, include_embeddings: bool) -> Self {
        self.options.include_embeddings = include_embeddings;
        self
    }

    #[inline]
    pub const fn options(&self) -> AnalysisOptions {
        self.options
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Query the service health endpoint
    #[inline]
    pub fn health(&self) -> Result<HealthStatus, ServiceError> {
        let url = self.endpoint("/health")?;
        debug!("Checking analysis service health at {}", url);

        let (status, body) = self.send(self.agent.get(url.as_str()).call())?;
        let health: HealthStatus = parse_success(status, &body)?;

        info!(
            "Analysis service status: {} (cache size {}, embeddings loaded: {})",
            health.status, health.cache_size, health.word2vec_loaded
        );
        Ok(health)
    }

    /// Submit raw text for analysis
    #[inline]
    pub fn analyze_text(&self, text: &str) -> Result<AnalysisResult, ServiceError> {
        validate_text(text)?;

        let url = self.endpoint("/api/process")?;
        let request = AnalysisRequest {
            text: text.to_string(),
            options: self.options,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| ServiceError::InvalidInput(format!("Failed to encode request: {e}")))?;

        debug!(
            "Submitting {} bytes for analysis (embeddings: {})",
            text.len(),
            self.options.include_embeddings
        );

        let (status, body) = self.send(
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(body.as_str()),
        )?;
        let result: AnalysisResult = parse_success(status, &body)?;

        info!(
            "Analysis complete: {} words, {} vocabulary entries{}",
            result.statistics.word_count,
            result.word_dictionary.len(),
            if result.cached == Some(true) {
                " (cached)"
            } else {
                ""
            }
        );
        Ok(result)
    }

    /// Upload a local text file for analysis.
    ///
    /// The file is validated locally first, then sent as a multipart form the
    /// way the service's file endpoint expects it.
    #[inline]
    pub fn analyze_file(&self, path: &Path) -> Result<AnalyzedText, ServiceError> {
        let text = load_text_file(path)?;
        let filename = path
            .file_name()
            .map_or_else(|| "upload.txt".to_string(), |name| name.to_string_lossy().into_owned());

        let url = self.endpoint("/api/process/file")?;
        let options = serde_json::to_string(&self.options)
            .map_err(|e| ServiceError::InvalidInput(format!("Failed to encode options: {e}")))?;
        let form = MultipartForm::new(&text)
            .field("options", &options)
            .file("file", &filename, &text);

        debug!("Uploading {} ({} bytes) for analysis", filename, text.len());
        let (status, body) = self.send(
            self.agent
                .post(url.as_str())
                .header("Content-Type", form.content_type())
                .send(form.finish().as_str()),
        )?;
        let mut result: AnalysisResult = parse_success(status, &body)?;
        if result.filename.is_none() {
            result.filename = Some(filename);
        }

        info!(
            "File analysis complete: {} words{}",
            result.statistics.word_count,
            if result.cached == Some(true) {
                " (cached)"
            } else {
                ""
            }
        );
        Ok(AnalyzedText { text, result })
    }

    /// Look up the embedding of a single word
    #[inline]
    pub fn word_info(&self, word: &str) -> Result<WordLookup, ServiceError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(ServiceError::InvalidInput("Word is required".to_string()));
        }

        let url = self.resource("/api/word/", word)?;
        debug!("Looking up embedding for '{}'", word);
        let (status, body) = self.send(self.agent.get(url.as_str()).call())?;
        parse_success(status, &body)
    }

    /// Similarity of two words according to the service's model
    #[inline]
    pub fn word_similarity(&self, word1: &str, word2: &str) -> Result<WordSimilarity, ServiceError> {
        let request = SimilarityRequest {
            word1: word1.trim().to_lowercase(),
            word2: word2.trim().to_lowercase(),
        };
        if request.word1.is_empty() || request.word2.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Both word1 and word2 are required".to_string(),
            ));
        }

        let url = self.endpoint("/api/similarity")?;
        let body = serde_json::to_string(&request)
            .map_err(|e| ServiceError::InvalidInput(format!("Failed to encode request: {e}")))?;
        let (status, body) = self.send(
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(body.as_str()),
        )?;
        parse_success(status, &body)
    }

    /// Fetch a previous analysis the service still holds under `cache_key`
    #[inline]
    pub fn cached_result(&self, cache_key: &str) -> Result<AnalysisResult, ServiceError> {
        let url = self.resource("/api/cached/", cache_key)?;
        debug!("Fetching cached analysis {}", cache_key);

        let (status, body) = self.send(self.agent.get(url.as_str()).call())?;
        let mut result: AnalysisResult = parse_success(status, &body)?;
        if result.cache_key.is_none() {
            result.cache_key = Some(cache_key.to_string());
        }
        Ok(result)
    }

    /// Drop a cached analysis; returns the service's confirmation message
    #[inline]
    pub fn delete_cached(&self, cache_key: &str) -> Result<String, ServiceError> {
        let url = self.resource("/api/cached/", cache_key)?;
        let (status, body) = self.send(self.agent.delete(url.as_str()).call())?;
        let response: MessageResponse = parse_success(status, &body)?;
        info!("Deleted cached analysis {}", cache_key);
        Ok(response.message)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|e| ServiceError::InvalidInput(format!("Invalid endpoint {path}: {e}")))
    }

    /// `prefix` joined with one percent-encoded path segment
    fn resource(&self, prefix: &str, segment: &str) -> Result<Url, ServiceError> {
        if segment.is_empty() {
            return Err(ServiceError::InvalidInput(format!(
                "Missing path segment for {prefix}"
            )));
        }
        let mut url = self.endpoint(prefix)?;
        url.path_segments_mut()
            .map_err(|()| ServiceError::InvalidInput(format!("Invalid endpoint {prefix}")))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn send(
        &self,
        response: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<(u16, String), ServiceError> {
        let mut response = response.map_err(|e| ServiceError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()
            .map_err(|e| ServiceError::Transport(format!("Failed to read response body: {e}")))?;

        debug!("Analysis service at {} answered {}", self.base_url, status);
        Ok((status, body))
    }
}

/// `multipart/form-data` body with text parts only
struct MultipartForm {
    boundary: String,
    body: String,
}

impl MultipartForm {
    /// Pick a boundary that does not occur in `content`
    fn new(content: &str) -> Self {
        let mut boundary = "wordlens-form-boundary".to_string();
        let mut attempt = 0_u32;
        while content.contains(boundary.as_str()) {
            attempt += 1;
            boundary = format!("wordlens-form-boundary-{attempt}");
        }
        Self {
            boundary,
            body: String::new(),
        }
    }

    fn field(mut self, name: &str, value: &str) -> Self {
        let part = [
            "--",
            self.boundary.as_str(),
            "\r\nContent-Disposition: form-data; name=\"",
            name,
            "\"\r\n\r\n",
            value,
            "\r\n",
        ]
        .concat();
        self.body.push_str(&part);
        self
    }

    fn file(mut self, name: &str, filename: &str, content: &str) -> Self {
        let filename: String = filename
            .chars()
            .map(|c| if matches!(c, '"' | '\r' | '\n') { '_' } else { c })
            .collect();
        let part = [
            "--",
            self.boundary.as_str(),
            "\r\nContent-Disposition: form-data; name=\"",
            name,
            "\"; filename=\"",
            filename.as_str(),
            "\"\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n",
            content,
            "\r\n",
        ]
        .concat();
        self.body.push_str(&part);
        self
    }

    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn finish(mut self) -> String {
        let closing = ["--", self.boundary.as_str(), "--\r\n"].concat();
        self.body.push_str(&closing);
        self.body
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Decode a 2xx body, or surface the service's error message verbatim
fn parse_success<T: serde::de::DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<T, ServiceError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map_or_else(|_| format!("HTTP error {status}"), |e| e.error);
        warn!("Analysis service rejected request ({}): {}", status, message);
        return Err(ServiceError::Rejected { status, message });
    }

    serde_json::from_str(body).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
}

fn validate_text(text: &str) -> Result<(), ServiceError> {
    if text.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "Text cannot be empty".to_string(),
        ));
    }
    if text.len() > MAX_TEXT_BYTES {
        return Err(ServiceError::InvalidInput(
            "Text too large. Maximum 5MB".to_string(),
        ));
    }
    Ok(())
}

/// Read a UTF-8 text file with one of the accepted extensions
#[inline]
pub fn load_text_file(path: &Path) -> Result<String, ServiceError> {
    let allowed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        });
    if !allowed {
        return Err(ServiceError::InvalidInput(format!(
            "File type not allowed. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let bytes = fs::read(path).map_err(|e| {
        ServiceError::InvalidInput(format!("Failed to read {}: {e}", path.display()))
    })?;
    String::from_utf8(bytes)
        .map_err(|_| ServiceError::InvalidInput("File must be valid UTF-8 text".to_string()))
}
