//! Decoding of PNG, JPEG and BMP files into [`RasterImage`]s, and writing
//! results back out.

use std::path::Path;

use image::DynamicImage;

use crate::error::{Result, ViewerError};
use crate::raster::RasterImage;

/// File extensions the loader recognises.
pub const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Whether `data` starts with the magic bytes of a supported format.
pub fn can_load(data: &[u8]) -> bool {
    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return true;
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return true;
    }

    // BMP: 42 4D (BM)
    data.len() >= 14 && data.starts_with(&[0x42, 0x4D])
}

/// Whether the path has a supported extension (case-insensitive).
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Read and decode an image file.
pub fn load_image(path: &Path) -> Result<RasterImage> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ViewerError::ImageNotFound {
            path: path.to_path_buf(),
        },
        _ => ViewerError::Io(e),
    })?;

    let image = load_image_from_memory(&bytes)?;
    log::info!(
        "Loaded {:?} ({}x{}, {})",
        path,
        image.width(),
        image.height(),
        if image.is_grayscale() { "gray" } else { "rgb" }
    );
    Ok(image)
}

/// Decode an in-memory image.
pub fn load_image_from_memory(data: &[u8]) -> Result<RasterImage> {
    if !can_load(data) {
        return Err(ViewerError::decode_failed("unrecognised image format"));
    }

    let decoded = image::load_from_memory(data)
        .map_err(|e| ViewerError::decode_failed(format!("Failed to decode image: {}", e)))?;

    log::trace!(
        "Decoded {}x{} image ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );
    Ok(RasterImage::from_dynamic(decoded))
}

/// Encode `image` to `path`. The format follows the extension.
pub fn save_image(image: &DynamicImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| ViewerError::EncodeFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::info!("Wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn test_magic_detection() {
        let png_magic = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert!(can_load(&png_magic));

        let jpeg_magic = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert!(can_load(&jpeg_magic));

        let random_data = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        assert!(!can_load(&random_data));
    }

    #[test]
    fn test_extensions() {
        assert!(has_supported_extension(Path::new("cells.PNG")));
        assert!(has_supported_extension(Path::new("dir/plate.jpeg")));
        assert!(!has_supported_extension(Path::new("notes.txt")));
        assert!(!has_supported_extension(Path::new("noext")));
    }

    #[test]
    fn test_load_from_memory_gray() {
        let gray = GrayImage::from_pixel(5, 3, Luma([42]));
        let image = load_image_from_memory(&png_bytes(DynamicImage::ImageLuma8(gray)))
            .expect("decode");
        assert!(image.is_grayscale());
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.pixel_value(4, 2).map(|v| v.to_string()), Some("42".into()));
    }

    #[test]
    fn test_load_from_memory_rgba_becomes_rgb() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
        let image = load_image_from_memory(&png_bytes(DynamicImage::ImageRgba8(rgba)))
            .expect("decode");
        assert!(!image.is_grayscale());
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        assert!(matches!(
            load_image_from_memory(b"definitely not an image"),
            Err(ViewerError::DecodeFailed { .. })
        ));

        // Valid magic, truncated body
        let mut truncated = png_bytes(DynamicImage::ImageLuma8(GrayImage::new(4, 4)));
        truncated.truncate(20);
        assert!(matches!(
            load_image_from_memory(&truncated),
            Err(ViewerError::DecodeFailed { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.png");
        assert!(matches!(
            load_image(&path),
            Err(ViewerError::ImageNotFound { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("plate.png");
        std::fs::write(&path, png_bytes(DynamicImage::ImageLuma8(GrayImage::new(7, 9))))
            .expect("write");
        assert_eq!(load_image(&path).expect("load").dimensions(), (7, 9));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.png");
        let gray = GrayImage::from_pixel(3, 2, Luma([99]));
        save_image(&DynamicImage::ImageLuma8(gray), &path).expect("save");

        let loaded = load_image(&path).expect("load");
        assert!(loaded.is_grayscale());
        assert_eq!(loaded.pixel_value(2, 1).map(|v| v.to_string()), Some("99".into()));
    }

    #[test]
    fn test_save_unknown_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.nope");
        assert!(matches!(
            save_image(&DynamicImage::ImageLuma8(GrayImage::new(1, 1)), &path),
            Err(ViewerError::EncodeFailed { .. })
        ));
    }
}
