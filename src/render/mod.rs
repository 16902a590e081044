//! CPU compositing of a scene state into a raster image.

pub mod composite;
pub mod images;
pub mod renderer;

pub use composite::Surface;
pub use images::{ImageSource, InMemoryImageSource, LocalImageSource, PreparedImage, decode_image};
pub use renderer::{compose_state, encode_png, render_data_url, render_png, to_data_url};
