//! Photo → face signatures.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::FaceSignature;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("cannot decode image: {0}")]
    Decode(String),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Turns encoded image bytes into one signature per detected face.
///
/// Signatures are returned in detector order. An image without faces yields
/// an empty vector, not an error.
pub trait FaceEncoder {
    fn encode(&mut self, image_bytes: &[u8]) -> Result<Vec<FaceSignature>, EncodeError>;
}

/// Decode JPEG/PNG/... bytes into an 8-bit RGB image.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, EncodeError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| EncodeError::Decode(e.to_string()))
}

/// SCRFD detection followed by ArcFace extraction for every face found.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    /// Load both models. Fails if either file is missing or invalid.
    pub fn load(scrfd_path: &str, arcface_path: &str) -> Result<Self, EncodeError> {
        let detector = FaceDetector::load(scrfd_path)?;
        let recognizer = FaceRecognizer::load(arcface_path)?;
        Ok(Self {
            detector,
            recognizer,
        })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, image_bytes: &[u8]) -> Result<Vec<FaceSignature>, EncodeError> {
        let image = decode_image(image_bytes)?;
        let faces = self.detector.detect(&image)?;

        faces
            .iter()
            .map(|face| Ok(self.recognizer.extract(&image, face)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    #[test]
    fn test_decode_png() {
        let img = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();

        let decoded = decode_image(buf.get_ref()).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(*decoded.get_pixel(2, 1), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_garbage_is_error() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, EncodeError::Decode(_)));
        assert!(err.to_string().starts_with("cannot decode image"));
    }

    #[test]
    fn test_load_missing_models() {
        let err = OnnxFaceEncoder::load("/nonexistent/det_10g.onnx", "/nonexistent/w600k_r50.onnx")
            .err()
            .unwrap();
        assert!(matches!(err, EncodeError::Detector(DetectorError::ModelNotFound(_))));
    }
}
