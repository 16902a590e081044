use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use base64::Engine as _;

use crate::foundation::error::{SceneError, SceneResult};

/// Decoded image, premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode any format `image` understands into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> SceneResult<PreparedImage> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

/// Payload of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> SceneResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| SceneError::validation("not a data: URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SceneError::validation("data: URL without payload"))?;
    if !header.ends_with(";base64") {
        return Err(SceneError::validation(format!(
            "unsupported data: URL encoding '{header}'"
        )));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| SceneError::validation(format!("invalid base64 in data: URL: {e}")))
}

/// Resolves image references (paths, `data:` URLs) to decoded images.
pub trait ImageSource: Send + Sync {
    fn load(&self, reference: &str) -> SceneResult<PreparedImage>;
}

/// Reads `data:` URLs inline and everything else from disk under `root`.
///
/// A leading `/` is treated as relative to `root`, the way a static host serves it.
#[derive(Clone, Debug)]
pub struct LocalImageSource {
    root: PathBuf,
}

impl LocalImageSource {
    /// Source resolving references against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory references resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `reference`; a leading `/` is relative to the root.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        self.root.join(reference.trim_start_matches('/'))
    }
}

impl ImageSource for LocalImageSource {
    fn load(&self, reference: &str) -> SceneResult<PreparedImage> {
        if reference.starts_with("data:") {
            return decode_image(&decode_data_url(reference)?);
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Err(SceneError::validation(format!(
                "remote image '{reference}' must be fetched before rendering"
            )));
        }
        let path = self.resolve(reference);
        let bytes = std::fs::read(&path).map_err(|e| {
            SceneError::validation(format!("read image '{}': {e}", path.display()))
        })?;
        decode_image(&bytes)
    }
}

/// Images registered up front; unknown references are an error.
#[derive(Clone, Debug, Default)]
pub struct InMemoryImageSource {
    images: HashMap<String, PreparedImage>,
}

impl InMemoryImageSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already decoded image.
    pub fn insert(&mut self, reference: impl Into<String>, image: PreparedImage) {
        self.images.insert(reference.into(), image);
    }

    /// Decode `bytes` and register them under `reference`.
    pub fn insert_encoded(&mut self, reference: impl Into<String>, bytes: &[u8]) -> SceneResult<()> {
        self.insert(reference, decode_image(bytes)?);
        Ok(())
    }

    /// Number of registered images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// No images registered.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSource for InMemoryImageSource {
    fn load(&self, reference: &str) -> SceneResult<PreparedImage> {
        self.images
            .get(reference)
            .cloned()
            .ok_or_else(|| SceneError::validation(format!("unknown image '{reference}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/images.rs"]
mod tests;
