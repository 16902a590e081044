use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::foundation::config::SessionConfig;
use crate::foundation::error::{SceneError, SceneResult};
use crate::remote::response::{GenerationResponse, classify_response};
use crate::remote::strip::strip_image_data;
use crate::scene::model::{Environment, EnvironmentState, TaskBundle};

/// Builds a one-state bundle from an image.
pub const CREATE_MANUAL_STEP: &str = "/api/create_manual_step";
/// Applies an instruction to a state.
pub const GENERATE_PROGRAM: &str = "/api/generate_program";
/// Suggests next states for a timeline.
pub const GENERATE_AUTOCOMPLETE: &str = "/api/generate_autocomplete";
/// Describes the change between two states.
pub const GENERATE_CAPTION: &str = "/api/generate_caption";

/// The remote multimodal service, seen as typed request/response pairs.
///
/// Implementations strip image payloads from the environment before sending it and validate
/// the response shape. Nothing is retried.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Build an initial task from a single scene image.
    async fn create_manual_step(&self, image: &str) -> SceneResult<TaskBundle>;

    /// Apply a natural-language instruction to `state`. `image` is the composite of `state`.
    async fn generate_program(
        &self,
        env: &Environment,
        state: &EnvironmentState,
        instruction: &str,
        image: &str,
    ) -> SceneResult<EnvironmentState>;

    /// Suggest next states from the whole timeline. `images` holds one composite per state.
    async fn generate_autocomplete(
        &self,
        env: &Environment,
        states: &[EnvironmentState],
        images: &[String],
    ) -> SceneResult<Vec<EnvironmentState>>;

    /// Describe the change between `[previous?, current]`.
    async fn generate_caption(
        &self,
        env: &Environment,
        states: &[EnvironmentState],
        images: &[String],
    ) -> SceneResult<String>;
}

#[derive(serde::Serialize)]
struct ManualStepRequest<'a> {
    image: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    images: &'a [String],
    env: &'a Value,
    env_states: &'a [EnvironmentState],
}

pub(crate) fn build_http(timeout: Duration) -> SceneResult<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// [`GenerationService`] over HTTP+JSON.
#[derive(Clone, Debug)]
pub struct HttpGenerationClient {
    http: Client,
    base_url: String,
}

impl HttpGenerationClient {
    /// Client for the service at `base_url`; a trailing `/` is ignored.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SceneResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http: build_http(timeout)?,
            base_url,
        })
    }

    /// Client for `cfg.service_url` with the configured timeout.
    pub fn from_config(cfg: &SessionConfig) -> SceneResult<Self> {
        Self::new(
            cfg.service_url.as_str(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    /// Service base URL without a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, endpoint: &str, body: &impl serde::Serialize) -> SceneResult<Value> {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!(%url, "sending request");
        let text = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        serde_json::from_str(&text)
            .map_err(|e| SceneError::protocol(format!("{endpoint} returned invalid JSON: {e}")))
    }

    async fn post_env(
        &self,
        endpoint: &str,
        env: &Environment,
        states: &[EnvironmentState],
        images: &[String],
        text: Option<&str>,
    ) -> SceneResult<GenerationResponse> {
        let stripped = strip_image_data(env)?;
        let body = GenerationRequest {
            text,
            images,
            env: &stripped.env,
            env_states: states,
        };
        let response = classify_response(self.post(endpoint, &body).await?)?;
        tracing::debug!(endpoint, ?response, "response received");
        Ok(response)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn create_manual_step(&self, image: &str) -> SceneResult<TaskBundle> {
        let body = ManualStepRequest { image, kind: "url" };
        let value = self.post(CREATE_MANUAL_STEP, &body).await?;
        serde_json::from_value(value).map_err(|e| {
            SceneError::protocol(format!("{CREATE_MANUAL_STEP} returned no task bundle: {e}"))
        })
    }

    async fn generate_program(
        &self,
        env: &Environment,
        state: &EnvironmentState,
        instruction: &str,
        image: &str,
    ) -> SceneResult<EnvironmentState> {
        let images = [image.to_string()];
        self.post_env(
            GENERATE_PROGRAM,
            env,
            std::slice::from_ref(state),
            &images,
            Some(instruction),
        )
        .await?
        .into_state()
    }

    async fn generate_autocomplete(
        &self,
        env: &Environment,
        states: &[EnvironmentState],
        images: &[String],
    ) -> SceneResult<Vec<EnvironmentState>> {
        self.post_env(GENERATE_AUTOCOMPLETE, env, states, images, Some(""))
            .await?
            .into_states()
    }

    async fn generate_caption(
        &self,
        env: &Environment,
        states: &[EnvironmentState],
        images: &[String],
    ) -> SceneResult<String> {
        self.post_env(GENERATE_CAPTION, env, states, images, None)
            .await?
            .into_text()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/remote/client.rs"]
mod tests;
