use std::io::Cursor;

use base64::Engine as _;
use image::{ImageFormat, RgbaImage};

use crate::foundation::core::Canvas;
use crate::foundation::error::SceneResult;
use crate::render::composite::Surface;
use crate::render::images::{ImageSource, PreparedImage};
use crate::scene::background::resolve_background;
use crate::scene::containment::is_within_closed_fixture;
use crate::scene::model::{Environment, EnvironmentState};

struct Layer {
    image: PreparedImage,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Images to draw for `state`, bottom first. Everything is decoded before anything is drawn.
fn collect_layers(
    env: &Environment,
    state: &EnvironmentState,
    canvas: Canvas,
    images: &dyn ImageSource,
) -> SceneResult<Vec<Layer>> {
    let mut layers = Vec::with_capacity(state.object_order.len() + 1);

    match resolve_background(env, state) {
        Some(reference) => layers.push(Layer {
            image: images.load(reference)?,
            x: 0.0,
            y: 0.0,
            width: f64::from(canvas.width),
            height: f64::from(canvas.height),
        }),
        None => tracing::debug!("no background for current fixture states"),
    }

    for id in &state.object_order {
        let Some(placement) = state.placement(id.as_str()) else {
            tracing::debug!(object = %id, "object has no position");
            continue;
        };
        if placement.is_hidden() || is_within_closed_fixture(placement.point(), env, state) {
            continue;
        }
        let Some(object) = env.object(id.as_str()) else {
            tracing::warn!(object = %id, "object missing from environment");
            continue;
        };
        if object.image.is_empty() {
            tracing::debug!(object = %id, "object has no image");
            continue;
        }
        layers.push(Layer {
            image: images.load(&object.image)?,
            x: placement.x,
            y: placement.y,
            width: object.width,
            height: object.height,
        });
    }

    Ok(layers)
}

/// Composite `state` onto a `canvas`-sized surface: the resolved background stretched to the
/// canvas, then every visible object in paint order.
#[tracing::instrument(level = "debug", skip_all, fields(width = canvas.width, height = canvas.height))]
pub fn compose_state(
    env: &Environment,
    state: &EnvironmentState,
    canvas: Canvas,
    images: &dyn ImageSource,
) -> SceneResult<Surface> {
    let layers = collect_layers(env, state, canvas, images)?;
    let mut surface = Surface::new(canvas.width, canvas.height)?;
    for layer in &layers {
        surface.draw_scaled(&layer.image, layer.x, layer.y, layer.width, layer.height)?;
    }
    Ok(surface)
}

/// PNG bytes of a straight-alpha image.
pub fn encode_png(image: &RgbaImage) -> SceneResult<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// `data:image/png;base64,...` form of PNG bytes.
pub fn to_data_url(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

/// PNG bytes of the composite.
pub fn render_png(
    env: &Environment,
    state: &EnvironmentState,
    canvas: Canvas,
    images: &dyn ImageSource,
) -> SceneResult<Vec<u8>> {
    encode_png(&compose_state(env, state, canvas, images)?.to_rgba_image()?)
}

/// The composite as a `data:image/png;base64,...` URL, the form the generation service takes.
pub fn render_data_url(
    env: &Environment,
    state: &EnvironmentState,
    canvas: Canvas,
    images: &dyn ImageSource,
) -> SceneResult<String> {
    Ok(to_data_url(&render_png(env, state, canvas, images)?))
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
