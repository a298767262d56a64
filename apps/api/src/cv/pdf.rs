//! HTML → PDF conversion. A remote rendering service is tried first when
//! configured; a local WeasyPrint binary is the fallback.

use std::io::ErrorKind;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::catalog::slug::fold_to_ascii;
use crate::errors::AppError;

const SERVICE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("No PDF renderer available: {0}")]
    Unavailable(String),

    #[error("PDF service rejected the document (status {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Local renderer failed: {0}")]
    Local(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PdfError> for AppError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
            other => AppError::Internal(anyhow::anyhow!("PDF generation failed: {other}")),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    html_content: &'a str,
    lang: &'a str,
}

#[derive(Clone)]
pub struct PdfRenderer {
    http: Client,
    service_url: Option<String>,
    weasyprint_bin: String,
}

impl PdfRenderer {
    pub fn new(http: Client, service_url: Option<String>, weasyprint_bin: String) -> Self {
        Self {
            http,
            service_url,
            weasyprint_bin,
        }
    }

    /// Renders `html` to PDF bytes. A service that answers with an error
    /// status fails the render; a service that cannot be reached falls
    /// through to the local binary.
    pub async fn render(&self, html: &str, lang: &str) -> Result<Vec<u8>, PdfError> {
        if let Some(url) = &self.service_url {
            if let Some(pdf) = self.render_remote(url, html, lang).await? {
                return Ok(pdf);
            }
        }
        self.render_local(html).await
    }

    /// `Ok(None)` when the service is unreachable.
    async fn render_remote(&self, base: &str, html: &str, lang: &str) -> Result<Option<Vec<u8>>, PdfError> {
        let response = self
            .http
            .post(format!("{base}/generate"))
            .timeout(SERVICE_TIMEOUT)
            .json(&GenerateRequest {
                html_content: html,
                lang,
            })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("PDF service unreachable ({e}), using local renderer");
                return Ok(None);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PdfError::Service {
                status: status.as_u16(),
                message,
            });
        }

        match response.bytes().await {
            Ok(bytes) => {
                info!("PDF rendered by service ({} bytes)", bytes.len());
                Ok(Some(bytes.to_vec()))
            }
            Err(e) => {
                warn!("PDF service response interrupted ({e}), using local renderer");
                Ok(None)
            }
        }
    }

    async fn render_local(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("cv.html");
        let output = dir.path().join("cv.pdf");
        tokio::fs::write(&input, html).await?;

        debug!("Running {} for local PDF render", self.weasyprint_bin);
        let result = Command::new(&self.weasyprint_bin)
            .arg(&input)
            .arg(&output)
            .output()
            .await;

        let finished = match result {
            Ok(finished) => finished,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PdfError::Unavailable(format!(
                    "PDF service not configured and '{}' is not installed",
                    self.weasyprint_bin
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(PdfError::Local(stderr.trim().to_string()));
        }

        let pdf = tokio::fs::read(&output).await?;
        info!("PDF rendered locally ({} bytes)", pdf.len());
        Ok(pdf)
    }
}

/// `CV_<Name>_<lang>.pdf`, with the name reduced to filename-safe characters.
pub fn pdf_filename(name: &str, lang: &str) -> String {
    let safe: String = fold_to_ascii(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let safe_lang: String = lang.chars().filter(char::is_ascii_alphanumeric).collect();
    if safe.is_empty() {
        format!("CV_{safe_lang}.pdf")
    } else {
        format!("CV_{safe}_{safe_lang}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_filename() {
        assert_eq!(pdf_filename("Ada  Lovelace", "en"), "CV_Ada_Lovelace_en.pdf");
        assert_eq!(pdf_filename("José Núñez", "es"), "CV_Jose_Nunez_es.pdf");
        assert_eq!(pdf_filename("Ñandú 李", "es"), "CV_Nandu__es.pdf");
        assert_eq!(pdf_filename("", "es"), "CV_es.pdf");
        assert_eq!(pdf_filename("Ada", "e\"n"), "CV_Ada_en.pdf");
    }

    #[tokio::test]
    async fn test_missing_local_binary_is_unavailable() {
        let renderer = PdfRenderer::new(Client::new(), None, "weasyprint-missing-for-tests".to_string());
        let err = renderer.render("<html></html>", "es").await.unwrap_err();
        assert!(matches!(err, PdfError::Unavailable(_)));
        let status = axum::response::IntoResponse::into_response(AppError::from(err)).status();
        assert_eq!(status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back_to_local() {
        let renderer = PdfRenderer::new(
            Client::new(),
            Some("http://127.0.0.1:9".to_string()),
            "weasyprint-missing-for-tests".to_string(),
        );
        let err = renderer.render("<html></html>", "en").await.unwrap_err();
        assert!(matches!(err, PdfError::Unavailable(_)));
    }
}
