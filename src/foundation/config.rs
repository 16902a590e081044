use std::{fs::File, io::BufReader, path::Path};

use crate::foundation::core::Canvas;
use crate::foundation::error::{SceneError, SceneResult};

/// Session-level settings. Every field has a default so a partial JSON file is enough.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the generation service (`/api/...` endpoints).
    pub service_url: String,
    /// Base URL of the static host serving `study_tasks/`.
    pub tasks_url: String,
    pub canvas: Canvas,
    /// When on, recaptioning requests are never queued.
    pub experiment_mode: bool,
    /// Minimum displacement for a drag to count as a move.
    pub move_threshold: f64,
    pub request_timeout_secs: u64,
    /// Image URL handed to `create_manual_step` when a task bundle is unavailable.
    pub fallback_image: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:5000".to_string(),
            tasks_url: "http://localhost:3000".to_string(),
            canvas: Canvas::default(),
            experiment_mode: true,
            move_threshold: 5.0,
            request_timeout_secs: 60,
            fallback_image: "/start.png".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SceneError::validation(format!("open config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| SceneError::validation(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject sizes, thresholds and URLs that cannot work.
    pub fn validate(&self) -> SceneResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(SceneError::validation("canvas width/height must be > 0"));
        }
        if !self.move_threshold.is_finite() || self.move_threshold < 0.0 {
            return Err(SceneError::validation(
                "move_threshold must be finite and >= 0",
            ));
        }
        if self.service_url.trim().is_empty() || self.tasks_url.trim().is_empty() {
            return Err(SceneError::validation("service_url/tasks_url must be non-empty"));
        }
        Ok(())
    }

    /// Auto-captioning runs only outside experiment mode.
    pub fn captioning_enabled(&self) -> bool {
        !self.experiment_mode
    }
}

/// Notified when the canvas is resized after a task has been loaded.
pub trait CanvasObserver: Send + Sync {
    fn canvas_resized(&self, canvas: Canvas);
}

/// The canvas size plus the observers interested in changes to it.
#[derive(Default)]
pub struct CanvasDimensions {
    canvas: Canvas,
    observers: Vec<Box<dyn CanvasObserver>>,
}

impl std::fmt::Debug for CanvasDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasDimensions")
            .field("canvas", &self.canvas)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CanvasDimensions {
    /// Start at `canvas` with no observers.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            observers: Vec::new(),
        }
    }

    /// Current canvas size.
    pub fn get(&self) -> Canvas {
        self.canvas
    }

    /// Register an observer for later resizes.
    pub fn subscribe(&mut self, observer: Box<dyn CanvasObserver>) {
        self.observers.push(observer);
    }

    /// Apply optional overrides; observers hear about it only if the size changed.
    pub fn update(&mut self, width: Option<u32>, height: Option<u32>) -> bool {
        let next = Canvas {
            width: width.filter(|w| *w > 0).unwrap_or(self.canvas.width),
            height: height.filter(|h| *h > 0).unwrap_or(self.canvas.height),
        };
        if next == self.canvas {
            return false;
        }
        tracing::info!(
            width = next.width,
            height = next.height,
            "canvas resized from task bundle"
        );
        self.canvas = next;
        for observer in &self.observers {
            observer.canvas_resized(next);
        }
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
