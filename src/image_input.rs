use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;

use crate::error::DescribeError;

/// The user-selected binary image plus its MIME type.
///
/// At most one of these is live per analysis attempt; it is built fresh
/// from the upload and dropped once the request resolves.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImageInput {
    /// Validates the upload and pins down its MIME type.
    ///
    /// The browser's declared content type wins when it is a concrete
    /// `image/*` type; otherwise the magic bytes decide. Empty or
    /// unrecognizable data is an extraction failure, reported before any
    /// network traffic happens.
    pub fn new(bytes: Vec<u8>, declared_mime: Option<&str>) -> Result<Self, DescribeError> {
        if bytes.is_empty() {
            return Err(DescribeError::ImageData("the upload was empty".into()));
        }

        let sniffed = image::guess_format(&bytes)
            .map_err(|_| DescribeError::ImageData("unrecognized image format".into()))?;

        let mime_type = match declared_mime {
            Some(m) if m.starts_with("image/") => m.to_string(),
            _ => format_mime(sniffed).to_string(),
        };

        Ok(Self { bytes, mime_type })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Standard base64 of the raw bytes, fully materialized before the
    /// request is built.
    pub fn as_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

fn format_mime(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_square_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(10, 10, image::Rgb([255, 0, 0]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut buf),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        buf
    }

    #[test]
    fn base64_round_trips_exactly() {
        let bytes = red_square_png();
        let input = ImageInput::new(bytes.clone(), Some("image/png")).unwrap();
        let decoded = general_purpose::STANDARD
            .decode(input.as_base64())
            .unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn empty_upload_is_an_extraction_failure() {
        let err = ImageInput::new(Vec::new(), Some("image/png")).unwrap_err();
        assert!(matches!(err, DescribeError::ImageData(_)));
        assert!(err.to_string().contains("image data"));
    }

    #[test]
    fn garbage_bytes_are_an_extraction_failure() {
        let err = ImageInput::new(vec![0x00, 0x01, 0x02, 0x03], None).unwrap_err();
        assert!(matches!(err, DescribeError::ImageData(_)));
    }

    #[test]
    fn missing_content_type_is_sniffed_from_magic_bytes() {
        let input = ImageInput::new(red_square_png(), None).unwrap();
        assert_eq!(input.mime_type(), "image/png");
    }

    #[test]
    fn declared_image_mime_wins_over_sniffing() {
        // A PNG uploaded under a JPEG content type keeps the browser's word.
        let input = ImageInput::new(red_square_png(), Some("image/jpeg")).unwrap();
        assert_eq!(input.mime_type(), "image/jpeg");
    }
}
