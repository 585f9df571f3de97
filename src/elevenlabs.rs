use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::error::Error;
use std::time::Duration;

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";
const MODEL_ID: &str = "eleven_multilingual_v2";
const STABILITY: f32 = 0.6;
const SIMILARITY_BOOST: f32 = 0.75;

/// Remote text-to-speech. Returns encoded audio (mp3) ready for playback.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, api_key: &str, text: &str) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>>;
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

pub struct ElevenLabsClient {
    client: Client,
    voice_id: String,
}

impl ElevenLabsClient {
    pub fn new() -> Result<Self, Box<dyn Error + Send + Sync>> {
        Self::with_voice(DEFAULT_VOICE_ID)
    }

    pub fn with_voice(voice_id: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            voice_id: voice_id.to_string(),
        })
    }

    fn stream_url(&self) -> String {
        format!("{}/{}/stream", ELEVENLABS_API_URL, self.voice_id)
    }
}

fn build_request(text: &str) -> SynthesisRequest<'_> {
    SynthesisRequest {
        text,
        model_id: MODEL_ID,
        voice_settings: VoiceSettings {
            stability: STABILITY,
            similarity_boost: SIMILARITY_BOOST,
        },
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, api_key: &str, text: &str) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        let response = self
            .client
            .post(self.stream_url())
            .header("xi-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "audio/mpeg")
            .json(&build_request(text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Voice API error ({}): {}", status, error_text).into());
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err("Voice API returned no audio".into());
        }
        Ok(audio.to_vec())
    }
}
