use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::config::{CanvasDimensions, SessionConfig};
use crate::foundation::core::Canvas;
use crate::foundation::error::{SceneError, SceneResult};
use crate::remote::client::{GenerationService, HttpGenerationClient};
use crate::remote::tasks::{HttpTaskSource, TaskSource};
use crate::render::images::{ImageSource, LocalImageSource};
use crate::render::renderer::{render_data_url, render_png};
use crate::scene::model::{EnvironmentState, TaskBundle};
use crate::timeline::events::TimelineEvent;
use crate::timeline::{Timeline, TimelineOptions};

/// File name of the exported bundle.
pub const EXPORT_JSON_NAME: &str = "env_and_envStates.json";

/// File name of the exported composite of state `index`.
pub fn export_png_name(index: usize) -> String {
    format!("env_state_{index}.png")
}

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionServices {
    pub tasks: Arc<dyn TaskSource>,
    pub generation: Arc<dyn GenerationService>,
    pub images: Arc<dyn ImageSource>,
}

impl std::fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionServices").finish_non_exhaustive()
    }
}

impl SessionServices {
    /// HTTP task host and generation service from `cfg`; images read from `image_root`.
    pub fn http(cfg: &SessionConfig, image_root: impl Into<PathBuf>) -> SceneResult<Self> {
        Ok(Self {
            tasks: Arc::new(HttpTaskSource::from_config(cfg)?),
            generation: Arc::new(HttpGenerationClient::from_config(cfg)?),
            images: Arc::new(LocalImageSource::new(image_root)),
        })
    }
}

/// One participant working on one task: the timeline plus everything needed to render it and
/// talk to the service.
#[derive(Debug)]
pub struct TaskSession {
    task: String,
    config: SessionConfig,
    canvas: CanvasDimensions,
    timeline: Timeline,
    requirements: Vec<String>,
    services: SessionServices,
}

impl TaskSession {
    /// Load `task` from the task host, falling back to a manual step built from
    /// `config.fallback_image` when it is missing or unreachable.
    #[tracing::instrument(skip(config, services, canvas))]
    pub async fn bootstrap(
        task: &str,
        config: SessionConfig,
        services: SessionServices,
        canvas: CanvasDimensions,
    ) -> SceneResult<Self> {
        let bundle = match services.tasks.fetch_task(task).await {
            Ok(Some(bundle)) => bundle,
            Ok(None) => {
                tracing::info!("task not found; creating manual step");
                services
                    .generation
                    .create_manual_step(&config.fallback_image)
                    .await?
            }
            Err(e) => {
                tracing::warn!(error = %e, "task fetch failed; creating manual step");
                services
                    .generation
                    .create_manual_step(&config.fallback_image)
                    .await?
            }
        };

        let requirements = match services.tasks.fetch_requirements(task).await {
            Ok(requirements) => requirements,
            Err(e) => {
                tracing::warn!(error = %e, "requirements unavailable");
                Vec::new()
            }
        };

        let mut session = Self::assemble(task, config, services, canvas, bundle)?;
        session.requirements = requirements;
        Ok(session)
    }

    /// A session over an already loaded bundle. Canvas overrides in the bundle are applied.
    pub fn from_bundle(
        task: &str,
        config: SessionConfig,
        services: SessionServices,
        canvas: Canvas,
        bundle: TaskBundle,
    ) -> SceneResult<Self> {
        Self::assemble(task, config, services, CanvasDimensions::new(canvas), bundle)
    }

    fn assemble(
        task: &str,
        config: SessionConfig,
        services: SessionServices,
        mut canvas: CanvasDimensions,
        bundle: TaskBundle,
    ) -> SceneResult<Self> {
        config.validate()?;
        let payload = &bundle.env_and_env_states;
        canvas.update(payload.highest_width, payload.highest_height);
        let timeline = Timeline::from_bundle(bundle, TimelineOptions::from(&config))?;
        tracing::info!(task, states = timeline.len(), "session ready");
        Ok(Self {
            task: task.to_string(),
            config,
            canvas,
            timeline,
            requirements: Vec::new(),
            services,
        })
    }

    /// Task name.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Canvas size after bundle overrides.
    pub fn canvas(&self) -> Canvas {
        self.canvas.get()
    }

    /// Requirements checklist; empty when unavailable.
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    /// The edited timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Mutable access for direct edits.
    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Delete a step on behalf of the participant. The initial state is kept.
    pub fn delete_step(&mut self, index: usize) -> SceneResult<TimelineEvent> {
        if index == 0 {
            tracing::warn!("refusing to delete the initial state");
            return Err(SceneError::rejected("the initial state cannot be deleted"));
        }
        self.timeline.delete_step(index)
    }

    /// Composite of `state` as a PNG data URL.
    pub fn composite(&self, state: &EnvironmentState) -> SceneResult<String> {
        render_data_url(
            self.timeline.env(),
            state,
            self.canvas.get(),
            self.services.images.as_ref(),
        )
    }

    fn composites(&self, states: &[EnvironmentState]) -> SceneResult<Vec<String>> {
        states.iter().map(|s| self.composite(s)).collect()
    }

    /// Apply `instruction` to the selected state; the result lands right after it.
    pub async fn submit_instruction(&mut self, instruction: &str) -> SceneResult<TimelineEvent> {
        let index = self
            .timeline
            .selected()
            .ok_or_else(|| SceneError::validation("select a state before giving an instruction"))?;
        self.submit_instruction_at(index, instruction).await
    }

    /// Apply `instruction` to the state at `index`. The result is inserted after `index` even
    /// if the selection moved while the request was pending.
    #[tracing::instrument(skip(self), fields(task = %self.task))]
    pub async fn submit_instruction_at(
        &mut self,
        index: usize,
        instruction: &str,
    ) -> SceneResult<TimelineEvent> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(SceneError::validation("instruction is empty"));
        }
        let state = self
            .timeline
            .state(index)
            .cloned()
            .ok_or_else(|| SceneError::invariant(format!("no state at index {index}")))?;
        let image = self.composite(&state)?;
        let generated = self
            .services
            .generation
            .generate_program(self.timeline.env(), &state, instruction, &image)
            .await?;
        self.timeline.apply_generated(index, generated)
    }

    /// Set the caption of `index` and regenerate that state from it, using the previous state
    /// as input. The initial state has no previous state; only its caption changes.
    #[tracing::instrument(skip(self), fields(task = %self.task))]
    pub async fn regenerate_from_caption(
        &mut self,
        index: usize,
        caption: &str,
    ) -> SceneResult<Option<TimelineEvent>> {
        self.timeline.set_caption(index, caption)?;
        let Some(previous) = index
            .checked_sub(1)
            .and_then(|i| self.timeline.state(i))
            .cloned()
        else {
            tracing::warn!(index, "previous state not found; caption not regenerated");
            return Ok(None);
        };
        let image = self.composite(&previous)?;
        let regenerated = self
            .services
            .generation
            .generate_program(self.timeline.env(), &previous, caption, &image)
            .await?;
        self.timeline.apply_regenerated(index, regenerated).map(Some)
    }

    /// Ask for suggested next states from the whole timeline. Returns the number received.
    #[tracing::instrument(skip(self), fields(task = %self.task))]
    pub async fn request_autocomplete(&mut self) -> SceneResult<usize> {
        let states = self.timeline.states().to_vec();
        let images = self.composites(&states)?;
        let candidates = self
            .services
            .generation
            .generate_autocomplete(self.timeline.env(), &states, &images)
            .await?;
        let count = candidates.len();
        self.timeline.set_autocomplete(candidates);
        Ok(count)
    }

    /// Run queued caption requests one at a time until the queue is empty. Returns how many
    /// were attempted; failures keep the previous caption.
    #[tracing::instrument(skip(self), fields(task = %self.task))]
    pub async fn drain_captions(&mut self) -> usize {
        let mut attempted = 0;
        while let Some(job) = self.timeline.next_caption_job() {
            attempted += 1;
            let states = job.states();
            let result = match self.composites(&states) {
                Ok(images) => {
                    self.services
                        .generation
                        .generate_caption(self.timeline.env(), &states, &images)
                        .await
                }
                Err(e) => Err(e),
            };
            self.timeline.finish_caption(job.index, result);
        }
        attempted
    }

    /// Write the bundle as pretty JSON into `dir`.
    pub fn export_json(&self, dir: impl AsRef<Path>) -> SceneResult<PathBuf> {
        let path = dir.as_ref().join(EXPORT_JSON_NAME);
        std::fs::write(&path, self.timeline.to_bundle().to_json_pretty()?)?;
        tracing::info!(path = %path.display(), "exported timeline");
        Ok(path)
    }

    /// PNG composite of the state at `index`.
    pub fn render_state_png(&self, index: usize) -> SceneResult<Vec<u8>> {
        let state = self
            .timeline
            .state(index)
            .ok_or_else(|| SceneError::invariant(format!("no state at index {index}")))?;
        render_png(
            self.timeline.env(),
            state,
            self.canvas.get(),
            self.services.images.as_ref(),
        )
    }

    /// Write the composite of the selected state into `dir`. `None` when nothing is selected.
    pub fn export_selected_png(&self, dir: impl AsRef<Path>) -> SceneResult<Option<PathBuf>> {
        let Some(index) = self.timeline.selected() else {
            tracing::warn!("no state selected; nothing to export");
            return Ok(None);
        };
        let png = self.render_state_png(index)?;
        let path = dir.as_ref().join(export_png_name(index));
        std::fs::write(&path, png)?;
        tracing::info!(path = %path.display(), index, "exported state image");
        Ok(Some(path))
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
