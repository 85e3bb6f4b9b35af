use crate::config::TranslationConfig;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Client for the public `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    source_lang: String,
    target_lang: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build translation HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let failed = |reason: String| PipelineError::Translation { text: text.to_string(), reason };

        let response = self.client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?
            .error_for_status()
            .map_err(|e| failed(e.to_string()))?;

        let body: Value = response.json().await.map_err(|e| failed(e.to_string()))?;
        let translated = join_segments(&body).ok_or_else(|| failed(format!("unexpected reply: {}", body)))?;
        debug!("Translated {:?} -> {:?}", text, translated);
        Ok(translated)
    }
}

/// Concatenates the translated text of each segment in a `dt=t` reply:
/// `[[["Spain","España",...], ...], ...]`.
fn join_segments(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments.iter()
        .filter_map(|segment| segment.get(0)?.as_str())
        .collect();
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Fixed lookup table; unknown names pass through.
#[derive(Default)]
pub struct DictionaryTranslator {
    entries: HashMap<String, String>,
}

impl DictionaryTranslator {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[async_trait]
impl Translator for DictionaryTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(self.entries.get(text).cloned().unwrap_or_else(|| text.to_string()))
    }
}

pub fn from_config(config: &TranslationConfig) -> Result<Box<dyn Translator>> {
    if config.enabled {
        Ok(Box::new(GoogleTranslator::new(config)?))
    } else {
        info!("Translation disabled, using {} fixed translations", config.fixed.len());
        Ok(Box::new(DictionaryTranslator::new(config.fixed.clone())))
    }
}

/// Translates each name in order, one request per distinct name.
pub async fn translate_all(translator: &dyn Translator, names: &[String]) -> Result<Vec<String>> {
    info!("Translating {} country names", names.len());
    let mut cache: HashMap<&str, String> = HashMap::new();
    let mut translated = Vec::with_capacity(names.len());

    for name in names {
        let english = match cache.get(name.as_str()) {
            Some(hit) => hit.clone(),
            None => {
                let english = translator.translate(name).await?;
                cache.insert(name.as_str(), english.clone());
                english
            }
        };
        translated.push(english);
    }

    Ok(translated)
}
