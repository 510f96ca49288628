use crate::config::{API_KEY_ENV, Config};
use crate::db::{ActivityEntry, DEFAULT_CATEGORY};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

pub const NO_ENTRIES_MESSAGE: &str = "No entries found for this day to summarize.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "Could not generate summary.";
pub const FALLBACK_MESSAGE: &str =
    "Unable to generate summary. Please ensure your API key is correctly configured.";

const SYSTEM_INSTRUCTION: &str = r#"You are a productivity expert assistant.
Analyze the provided daily activity log.
Return a response in plain text that is easy to read.

Please follow this structure exactly:

SUMMARY
[2-3 sentences summarizing the day's main focus and activities]

PRODUCTIVITY PULSE
[One word status like "High", "Balanced", or "Fragmented"] - [Brief explanation]

KEY INSIGHT
[One constructive, actionable tip for better time management tomorrow]

Do not use Markdown formatting (like **bold** or # headers). Use simple spacing and capitalization."#;

/// Text-generation backend used for day summaries.
pub trait TextGenerator {
    fn generate(&self, system: &str, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Summarizes a day's entries. Never fails: every error resolves to [`FALLBACK_MESSAGE`].
pub async fn summarize<G: TextGenerator>(
    generator: &G,
    date: &str,
    entries: &[ActivityEntry],
) -> String {
    if entries.is_empty() {
        return NO_ENTRIES_MESSAGE.to_string();
    }

    let prompt = build_prompt(date, entries);

    match generator.generate(SYSTEM_INSTRUCTION, &prompt).await {
        Ok(text) if text.trim().is_empty() => EMPTY_RESPONSE_MESSAGE.to_string(),
        Ok(text) => {
            info!(date, entries = entries.len(), "day summary generated");
            text
        }
        Err(error) => {
            warn!(error = %error, date, "day summary generation failed");
            FALLBACK_MESSAGE.to_string()
        }
    }
}

/// Round-trips a tiny prompt so configuration problems surface as errors instead of the fallback.
pub async fn test_connection<G: TextGenerator>(generator: &G) -> Result<String> {
    let reply = generator
        .generate(
            "Return exactly one short sentence confirming the API connection is healthy.",
            "Health check for LinearDay.",
        )
        .await?;

    if reply.trim().is_empty() {
        bail!("AI API returned an empty response");
    }

    Ok(reply.trim().to_string())
}

pub fn build_prompt(date: &str, entries: &[ActivityEntry]) -> String {
    let lines = entries
        .iter()
        .map(|entry| {
            let category = Some(entry.category.trim())
                .filter(|category| !category.is_empty())
                .unwrap_or(DEFAULT_CATEGORY);
            format!(
                "- {} to {}: {} ({})",
                entry.start_time, entry.end_time, entry.description, category
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Activity Log for {date}:\n{lines}")
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout_seconds: u64,
    enabled: bool,
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.ai_api_base_url.clone(),
            model: config.ai_model.clone(),
            api_key: config.resolve_api_key(),
            timeout_seconds: config.ai_timeout_seconds.max(5),
            enabled: config.ai_enabled,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate_content(&self, system: &str, prompt: &str) -> Result<String> {
        if !self.enabled {
            bail!("AI summaries are disabled (ai.enabled = false)");
        }

        let api_key = self.api_key.as_deref().with_context(|| {
            format!("AI API key is missing. Set `linearday config set ai.api_key <KEY>` or `{API_KEY_ENV}`.")
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key).context("Failed to build API key header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create AI HTTP client")?;

        let request_body = json!({
            "system_instruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = client
            .post(self.endpoint())
            .json(&request_body)
            .send()
            .await
            .context("AI API request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read AI response body")?;

        if !status.is_success() {
            bail!("AI API error {}: {}", status, body);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse AI response: {body}"))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .ok_or_else(|| anyhow!("AI response did not include any candidates"))
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, system: &str, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        self.generate_content(system, prompt)
    }
}
