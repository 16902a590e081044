use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::foundation::config::SessionConfig;
use crate::foundation::error::{SceneError, SceneResult};
use crate::remote::client::build_http;
use crate::scene::model::TaskBundle;

/// Where study tasks are published.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// The task bundle, or `None` when the task does not exist.
    async fn fetch_task(&self, task: &str) -> SceneResult<Option<TaskBundle>>;

    /// Requirement lines shown alongside the task.
    async fn fetch_requirements(&self, task: &str) -> SceneResult<Vec<String>>;
}

#[derive(serde::Deserialize)]
struct Requirements {
    #[serde(default)]
    requirements: Vec<String>,
}

/// Path of the bundle for `task` on the task host.
pub fn task_path(task: &str) -> String {
    format!("/study_tasks/{task}/{task}.json")
}

/// Path of the requirements checklist for `task`.
pub fn requirements_path(task: &str) -> String {
    format!("/study_tasks/{task}/{task}_requirements.json")
}

/// [`TaskSource`] backed by a static file host.
#[derive(Clone, Debug)]
pub struct HttpTaskSource {
    http: Client,
    base_url: String,
}

impl HttpTaskSource {
    /// Task host at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SceneResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http: build_http(timeout)?,
            base_url,
        })
    }

    /// Task host at `cfg.tasks_url` with the configured timeout.
    pub fn from_config(cfg: &SessionConfig) -> SceneResult<Self> {
        Self::new(
            cfg.tasks_url.as_str(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    /// `None` on 404; other failures propagate.
    async fn get_text(&self, path: &str) -> SceneResult<Option<String>> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "fetching");
        let response = self.http.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.text().await?))
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn fetch_task(&self, task: &str) -> SceneResult<Option<TaskBundle>> {
        let Some(text) = self.get_text(&task_path(task)).await? else {
            return Ok(None);
        };
        TaskBundle::from_reader(text.as_bytes()).map(Some)
    }

    async fn fetch_requirements(&self, task: &str) -> SceneResult<Vec<String>> {
        let path = requirements_path(task);
        let text = self
            .get_text(&path)
            .await?
            .ok_or_else(|| SceneError::validation(format!("{path} not found")))?;
        let parsed: Requirements = serde_json::from_str(&text)
            .map_err(|e| SceneError::protocol(format!("{path}: {e}")))?;
        Ok(parsed.requirements)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/remote/tasks.rs"]
mod tests;
