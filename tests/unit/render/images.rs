use std::io::Cursor;

use base64::Engine as _;

use super::*;

fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let prepared = decode_image(&png_bytes([100, 50, 200, 128])).unwrap();
    assert_eq!((prepared.width, prepared.height), (1, 1));
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn fully_transparent_pixels_lose_color() {
    let prepared = decode_image(&png_bytes([9, 9, 9, 0])).unwrap();
    assert_eq!(prepared.rgba8_premul.as_slice(), &[0, 0, 0, 0]);
}

#[test]
fn garbage_is_an_image_error() {
    assert!(matches!(
        decode_image(b"not an image"),
        Err(SceneError::Image(_))
    ));
}

#[test]
fn data_urls_decode_and_reject_non_base64() {
    let png = png_bytes([1, 2, 3, 255]);
    assert_eq!(decode_data_url(&data_url(&png)).unwrap(), png);
    assert!(decode_data_url("data:text/plain,hello").is_err());
    assert!(decode_data_url("data:image/png;base64").is_err());
    assert!(decode_data_url("/start.png").is_err());
}

#[test]
fn local_source_reads_data_urls_and_root_relative_paths() {
    let dir = std::env::temp_dir().join(format!("sceneline-images-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("objects")).unwrap();
    let png = png_bytes([255, 0, 0, 255]);
    std::fs::write(dir.join("objects/bowl.png"), &png).unwrap();

    let source = LocalImageSource::new(&dir);
    assert_eq!(source.resolve("/objects/bowl.png"), dir.join("objects/bowl.png"));
    assert_eq!(source.load("/objects/bowl.png").unwrap().width, 1);
    assert_eq!(source.load("objects/bowl.png").unwrap().width, 1);
    assert_eq!(source.load(&data_url(&png)).unwrap().height, 1);
    assert!(source.load("objects/missing.png").is_err());
    assert!(source.load("https://example.com/bowl.png").is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn in_memory_source_serves_registered_images() {
    let mut source = InMemoryImageSource::new();
    assert!(source.is_empty());
    source
        .insert_encoded("bowl", &png_bytes([0, 255, 0, 255]))
        .unwrap();
    assert_eq!(source.len(), 1);
    assert_eq!(
        source.load("bowl").unwrap().rgba8_premul.as_slice(),
        &[0, 255, 0, 255]
    );
    assert!(source.load("plate").is_err());
}
