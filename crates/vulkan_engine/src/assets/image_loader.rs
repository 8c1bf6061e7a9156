//! Texture decoding to the RGBA8 layout uploads expect.

use std::path::Path;

use crate::assets::{AssetError, ImageData};

/// Decode an image file, converting whatever it holds to tightly packed
/// RGBA8.
pub fn load_image(path: &Path) -> Result<ImageData, AssetError> {
    let decoded = image::open(path)?.into_rgba8();
    let (width, height) = decoded.dimensions();
    log::info!("loaded {}: {width}x{height}", path.display());
    Ok(ImageData {
        pixels: decoded.into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_rgba8() {
        // A 2x2 RGB image gains an alpha channel on load
        let mut rgb = image::RgbImage::new(2, 2);
        rgb.put_pixel(0, 0, image::Rgb([255, 0, 0]));

        let dir = std::env::temp_dir().join("vulkan_engine_image_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("red.png");
        rgb.save(&path).unwrap();

        let data = load_image(&path).unwrap();
        assert_eq!((data.width, data.height), (2, 2));
        assert_eq!(data.pixels.len(), 2 * 2 * 4);
        assert_eq!(&data.pixels[0..4], &[255, 0, 0, 255]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_image(Path::new("/nonexistent/texture.png")).is_err());
    }
}
