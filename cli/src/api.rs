use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{FlowError, FlowResult};
use crate::planner::{ExecutionProfile, PlanRequest};

const API_KEY_HEADER: &str = "x-goog-api-key";
const JSON_MIME: &str = "application/json";
const AUDIO_MODALITY: &str = "AUDIO";

/// The external generative service. Both calls hand back the raw payload and
/// leave interpretation to `response::parse_plan` and `audio::decode_pcm16`.
#[async_trait]
pub trait PlanService: Send + Sync {
    /// Text of the first candidate, or `None` when the model produced none.
    async fn generate_plan_text(&self, request: &PlanRequest) -> FlowResult<Option<String>>;

    /// Base64 audio of the first candidate, or `None` when no audio came back.
    async fn synthesize_speech(&self, text: &str) -> FlowResult<Option<String>>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    speech_model: String,
    voice: String,
    fast_timeout: Duration,
    deep_timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or(FlowError::MissingApiKey)?.to_string();
        let mut raw_url = config.base_url().to_string();
        if !raw_url.ends_with('/') {
            raw_url.push('/');
        }
        let base_url = Url::parse(&raw_url).context("invalid API base URL")?;
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
            speech_model: config.speech_model().to_string(),
            voice: config.voice().to_string(),
            fast_timeout: config.request_timeout(),
            deep_timeout: config.deep_request_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout_for(&self, profile: &ExecutionProfile) -> Duration {
        match profile {
            ExecutionProfile::Fast { .. } => self.fast_timeout,
            ExecutionProfile::Deep { .. } => self.deep_timeout,
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentBody<'_>,
        timeout: Duration,
    ) -> FlowResult<GenerateContentResponse> {
        let url = self
            .base_url
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|err| FlowError::Api { status: 0, message: format!("bad model url: {err}") })?;
        debug!(%url, timeout_secs = timeout.as_secs(), "calling generateContent");

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = api_error_message(&text);
            warn!(status = status.as_u16(), %message, "generateContent failed");
            return Err(FlowError::Api { status: status.as_u16(), message });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| {
            warn!(error = %err, "generateContent body is not the expected JSON");
            FlowError::UnreadableResponse(err.to_string())
        })
    }
}

#[async_trait]
impl PlanService for GeminiClient {
    async fn generate_plan_text(&self, request: &PlanRequest) -> FlowResult<Option<String>> {
        let mut config = GenerationConfig {
            response_mime_type: Some(JSON_MIME),
            response_schema: Some(&request.schema),
            ..GenerationConfig::default()
        };
        match request.profile {
            ExecutionProfile::Fast { temperature } => config.temperature = Some(temperature),
            ExecutionProfile::Deep { thinking_budget } => {
                config.thinking_config = Some(ThinkingConfig { thinking_budget })
            }
        }
        let body = GenerateContentBody::new(&request.prompt, config);
        let timeout = self.timeout_for(&request.profile);
        let response = self.generate_content(&request.model, &body, timeout).await?;
        Ok(response.text())
    }

    async fn synthesize_speech(&self, text: &str) -> FlowResult<Option<String>> {
        let config = GenerationConfig {
            response_modalities: Some(vec![AUDIO_MODALITY]),
            speech_config: Some(SpeechConfig::with_voice(&self.voice)),
            ..GenerationConfig::default()
        };
        let body = GenerateContentBody::new(text, config);
        let response = self.generate_content(&self.speech_model, &body, self.fast_timeout).await?;
        Ok(response.inline_audio())
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.pointer("/error/message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

impl<'a> GenerateContentBody<'a> {
    fn new(text: &'a str, generation_config: GenerationConfig<'a>) -> Self {
        let contents = vec![RequestContent { parts: vec![RequestPart { text }] }];
        Self { contents, generation_config }
    }
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

impl<'a> SpeechConfig<'a> {
    fn with_voice(voice_name: &'a str) -> Self {
        Self { voice_config: VoiceConfig { prebuilt_voice_config: PrebuiltVoice { voice_name } } }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }

    // Thought summaries are not part of the answer.
    fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter(|part| !part.thought.unwrap_or(false))
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn inline_audio(&self) -> Option<String> {
        self.first_parts()
            .iter()
            .filter_map(|part| part.inline_data.as_ref())
            .map(|inline| inline.data.clone())
            .find(|data| !data.is_empty())
    }
}
