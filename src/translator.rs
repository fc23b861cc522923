//! Best-effort text translation.
//!
//! Every failure degrades to returning the input unchanged, so translation
//! never blocks record creation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::TranslateError;

/// Source language value that lets the service detect the language.
pub const AUTO: &str = "auto";

/// Public endpoint of the unofficial Google Translate API.
pub const GOOGLE_TRANSLATE_URL: &str = "https://translate.google.com/translate_a/single";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text`, reporting failures.
    async fn try_translate(&self, text: &str, target_lang: &str, source_lang: &str) -> Result<String, TranslateError>;

    /// Translate `text`, falling back to `text` itself on any failure.
    async fn translate(&self, text: &str, target_lang: &str, source_lang: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        match self.try_translate(text, target_lang, source_lang).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation failed, keeping original text: {}", e);
                text.to_string()
            }
        }
    }

    /// Translate each item, keeping order.
    async fn translate_all(&self, items: &[String], target_lang: &str, source_lang: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.translate(item, target_lang, source_lang).await);
        }
        out
    }
}

/// Returns every text untouched. Used when translation is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl Translator for Passthrough {
    async fn try_translate(&self, text: &str, _target_lang: &str, _source_lang: &str) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for std::sync::Arc<T> {
    async fn try_translate(&self, text: &str, target_lang: &str, source_lang: &str) -> Result<String, TranslateError> {
        (**self).try_translate(text, target_lang, source_lang).await
    }
}

/// Client for the `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn try_translate(&self, text: &str, target_lang: &str, source_lang: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let translated = parse_translation(&body)?;
        debug!("Translated {} chars to {}", text.len(), target_lang);
        Ok(translated)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The body looks like `[[["Bonjour","Hello",null,null,1],...],null,"en",...]`.
pub fn parse_translation(body: &str) -> Result<String, TranslateError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| TranslateError::Malformed(e.to_string()))?;

    let segments = value
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::Malformed("missing segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|s| s.as_str()))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::Malformed("no translated segments".to_string()));
    }
    Ok(translated)
}
