//! Document fetch and image preparation before OCR.

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use super::OcrError;

/// Download document bytes from a URL.
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, OcrError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| OcrError::Fetch(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(OcrError::Fetch(format!("HTTP {}", resp.status())));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| OcrError::Fetch(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Decode image bytes, normalize color mode, and bound dimensions.
///
/// Oversized scans are downscaled with Lanczos so OCR latency and memory
/// stay bounded.
pub fn prepare_image(bytes: &[u8], max_dimension: u32) -> Result<DynamicImage, OcrError> {
    let img = image::load_from_memory(bytes).map_err(|e| OcrError::Decode(e.to_string()))?;
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let (width, height) = (img.width(), img.height());
    if width.max(height) <= max_dimension {
        return Ok(img);
    }

    let scale = max_dimension as f64 / width.max(height) as f64;
    let new_width = (width as f64 * scale) as u32;
    let new_height = (height as f64 * scale) as u32;
    debug!(
        "downscaling image {}x{} -> {}x{}",
        width, height, new_width, new_height
    );
    Ok(img.resize(new_width, new_height, FilterType::Lanczos3))
}

/// Normalize OCR output: trim every line, drop blank lines.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_blank_lines() {
        let raw = "  Aspirin 500mg  \n\n\n  Qty 2   Rate 50\n   \nTotal 100\n";
        assert_eq!(clean_text(raw), "Aspirin 500mg\nQty 2   Rate 50\nTotal 100");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text("\n  \n\t\n"), "");
    }

    #[test]
    fn test_prepare_image_rejects_garbage() {
        let err = prepare_image(b"not an image", 4000).unwrap_err();
        assert!(matches!(err, OcrError::Decode(_)));
    }

    #[test]
    fn test_prepare_image_downscales_oversized() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(200, 100));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let prepared = prepare_image(&bytes, 50).unwrap();
        assert_eq!(prepared.width(), 50);
        assert_eq!(prepared.height(), 25);
    }

    #[test]
    fn test_prepare_image_keeps_small_images() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(20, 10));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let prepared = prepare_image(&bytes, 4000).unwrap();
        assert_eq!((prepared.width(), prepared.height()), (20, 10));
    }
}
