//! Face restoration
//!
//! A [`FaceRestorer`] takes a decoded image plus the fixed [`EnhanceParams`]
//! and returns an [`EnhanceOutput`]. Restorers disagree on how they package
//! results (a bare image, a pair, a four-tuple), so callers go through
//! [`EnhanceOutput::into_restored_image`] instead of indexing themselves.

use crate::{
    config::{EnhanceParams, InferenceConfig},
    error::{Result, RetouchError},
    inference::InferenceBackend,
    models::PreprocessingConfig,
    utils::ImagePreprocessor,
};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use instant::Instant;
use log::info;
use tracing::{debug, instrument};

/// What a restorer hands back
#[derive(Debug, Clone)]
pub enum EnhanceOutput {
    /// A single image, or nothing
    Image(Option<DynamicImage>),
    /// A positional result; each slot may be empty
    Tuple(Vec<Option<DynamicImage>>),
}

impl EnhanceOutput {
    /// Select the restored image from any supported result shape
    ///
    /// | shape      | restored image |
    /// |------------|----------------|
    /// | bare       | the image      |
    /// | 2 values   | position 1     |
    /// | 4 values   | position 2     |
    ///
    /// # Errors
    /// - Any other tuple length
    /// - The selected slot is empty
    pub fn into_restored_image(self) -> Result<DynamicImage> {
        let selected = match self {
            Self::Image(image) => image,
            Self::Tuple(values) => {
                let index = match values.len() {
                    2 => 1,
                    4 => 2,
                    n => {
                        return Err(RetouchError::restoration_failed(format!(
                            "Unsupported restoration result shape: {n} values"
                        )))
                    },
                };
                values.into_iter().nth(index).flatten()
            },
        };
        selected.ok_or_else(|| RetouchError::restoration_failed("Restoration failed - null result"))
    }
}

/// A face restoration model
pub trait FaceRestorer: Send {
    /// Restore `image` with the given parameters
    ///
    /// # Errors
    /// - Preprocessing, inference or compositing failures
    fn enhance(&mut self, image: &DynamicImage, params: &EnhanceParams) -> Result<EnhanceOutput>;
}

/// Restorer backed by an image-to-image inference backend (GFPGAN style)
///
/// Returns `(cropped_input, restored_image)`; the second slot is empty when
/// `paste_back` is disabled.
pub struct ModelFaceRestorer {
    backend: Box<dyn InferenceBackend>,
    preprocessing: PreprocessingConfig,
}

impl std::fmt::Debug for ModelFaceRestorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFaceRestorer")
            .field("preprocessing", &self.preprocessing)
            .finish_non_exhaustive()
    }
}

impl ModelFaceRestorer {
    /// Initialize the backend and build a restorer around it
    ///
    /// # Errors
    /// - Backend initialization or model loading failures
    pub fn new(mut backend: Box<dyn InferenceBackend>, inference: &InferenceConfig) -> Result<Self> {
        info!("Initializing face restoration model");
        if let Some(load_time) = backend.initialize(inference)? {
            info!(
                "Restoration model ready in {:.0}ms",
                load_time.as_secs_f64() * 1000.0
            );
        }
        let preprocessing = backend.get_preprocessing_config()?;
        preprocessing.validate()?;
        Ok(Self {
            backend,
            preprocessing,
        })
    }

    /// Region to restore as (x, y, width, height)
    fn face_region(dimensions: (u32, u32), only_center_face: bool) -> (u32, u32, u32, u32) {
        let (width, height) = dimensions;
        if only_center_face {
            let side = width.min(height);
            ((width - side) / 2, (height - side) / 2, side, side)
        } else {
            (0, 0, width, height)
        }
    }

    /// Run the model on `face` and return it restored at its own size
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn restore_region(&mut self, face: &DynamicImage, has_aligned: bool) -> Result<DynamicImage> {
        let preprocess_start = Instant::now();
        let (tensor, letterbox) = if has_aligned {
            (
                ImagePreprocessor::preprocess_stretched(face, &self.preprocessing)?,
                None,
            )
        } else {
            let (tensor, letterbox) =
                ImagePreprocessor::preprocess_for_inference(face, &self.preprocessing)?;
            (tensor, Some(letterbox))
        };
        debug!(
            preprocessing_ms = preprocess_start.elapsed().as_millis() as u64,
            "Face tensor prepared"
        );

        let inference_start = Instant::now();
        let output = self.backend.infer(&tensor)?;
        debug!(
            inference_ms = inference_start.elapsed().as_millis() as u64,
            "Restoration inference complete"
        );

        let restored = ImagePreprocessor::tensor_to_rgb(&output, &self.preprocessing)?;
        let restored = match letterbox {
            // Drop the padding, scaled to the output resolution
            Some(letterbox) => {
                let ratio = restored.width() as f32 / letterbox.target_size as f32;
                let (x, y, w, h) = letterbox.content_region();
                let scale = |v: u32| (v as f32 * ratio).round() as u32;
                let (x, y) = (scale(x), scale(y));
                let w = scale(w).clamp(1, restored.width().saturating_sub(x).max(1));
                let h = scale(h).clamp(1, restored.height().saturating_sub(y).max(1));
                image::imageops::crop_imm(&restored, x, y, w, h).to_image()
            },
            None => restored,
        };

        let (face_width, face_height) = face.dimensions();
        Ok(DynamicImage::ImageRgb8(image::imageops::resize(
            &restored,
            face_width,
            face_height,
            FilterType::Lanczos3,
        )))
    }
}

impl FaceRestorer for ModelFaceRestorer {
    #[instrument(
        skip(self, image),
        fields(dimensions = %format!("{}x{}", image.width(), image.height()))
    )]
    fn enhance(&mut self, image: &DynamicImage, params: &EnhanceParams) -> Result<EnhanceOutput> {
        if params.upscale == 0 {
            return Err(RetouchError::config_value_error(
                "upscale factor",
                params.upscale,
                "1-4",
            ));
        }

        let total_start = Instant::now();
        let (x, y, w, h) = Self::face_region(image.dimensions(), params.only_center_face);
        let cropped = image.crop_imm(x, y, w, h);

        let restored_face = self.restore_region(&cropped, params.has_aligned)?;

        let restored_image = if params.paste_back {
            let (width, height) = image.dimensions();
            let up = params.upscale;
            let mut background = image
                .resize_exact(width * up, height * up, FilterType::Lanczos3)
                .to_rgb8();
            let face = restored_face
                .resize_exact(w * up, h * up, FilterType::Lanczos3)
                .to_rgb8();
            image::imageops::replace(
                &mut background,
                &face,
                i64::from(x * up),
                i64::from(y * up),
            );
            Some(DynamicImage::ImageRgb8(background))
        } else {
            None
        };

        debug!(
            total_ms = total_start.elapsed().as_millis() as u64,
            pasted_back = params.paste_back,
            "Restoration finished"
        );
        Ok(EnhanceOutput::Tuple(vec![Some(cropped), restored_image]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use image::{Rgb, RgbImage};

    fn marker(value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([value, value, value])))
    }

    fn restorer() -> ModelFaceRestorer {
        ModelFaceRestorer::new(
            Box::new(MockBackend::restoration(16)),
            &InferenceConfig::default(),
        )
        .unwrap()
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, 128])
        }))
    }

    #[test]
    fn test_adapter_selects_position_by_shape() {
        let bare = EnhanceOutput::Image(Some(marker(7)));
        assert_eq!(bare.into_restored_image().unwrap(), marker(7));

        let pair = EnhanceOutput::Tuple(vec![Some(marker(1)), Some(marker(7))]);
        assert_eq!(pair.into_restored_image().unwrap(), marker(7));

        let quad = EnhanceOutput::Tuple(vec![
            Some(marker(1)),
            Some(marker(2)),
            Some(marker(7)),
            Some(marker(4)),
        ]);
        assert_eq!(quad.into_restored_image().unwrap(), marker(7));
    }

    #[test]
    fn test_adapter_rejects_other_lengths() {
        for n in [0usize, 1, 3, 5] {
            let output = EnhanceOutput::Tuple(vec![Some(marker(0)); n]);
            let err = output.into_restored_image().unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Unsupported restoration result shape: {n} values")
            );
        }
    }

    #[test]
    fn test_adapter_null_result() {
        let bare = EnhanceOutput::Image(None);
        assert_eq!(
            bare.into_restored_image().unwrap_err().to_string(),
            "Restoration failed - null result"
        );

        let pair = EnhanceOutput::Tuple(vec![Some(marker(1)), None]);
        assert!(pair.into_restored_image().is_err());
    }

    #[test]
    fn test_paste_back_upscales_whole_image() {
        let mut restorer = restorer();
        let image = gradient(12, 8);
        let output = restorer.enhance(&image, &EnhanceParams::default()).unwrap();

        let EnhanceOutput::Tuple(values) = &output else {
            panic!("expected tuple output");
        };
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_ref().unwrap().dimensions(), (12, 8));

        let restored = output.into_restored_image().unwrap();
        assert_eq!(restored.dimensions(), (24, 16));
    }

    #[test]
    fn test_without_paste_back_restored_slot_is_empty() {
        let mut restorer = restorer();
        let params = EnhanceParams {
            paste_back: false,
            ..EnhanceParams::default()
        };
        let output = restorer.enhance(&gradient(8, 8), &params).unwrap();
        assert!(output.into_restored_image().is_err());
    }

    #[test]
    fn test_center_face_and_aligned_modes() {
        let mut restorer = restorer();
        let params = EnhanceParams {
            upscale: 3,
            has_aligned: true,
            only_center_face: true,
            paste_back: true,
        };
        let output = restorer.enhance(&gradient(20, 10), &params).unwrap();
        let EnhanceOutput::Tuple(values) = output else {
            panic!("expected tuple output");
        };
        assert_eq!(values[0].as_ref().unwrap().dimensions(), (10, 10));
        assert_eq!(values[1].as_ref().unwrap().dimensions(), (60, 30));
    }

    #[test]
    fn test_face_region() {
        assert_eq!(ModelFaceRestorer::face_region((20, 10), true), (5, 0, 10, 10));
        assert_eq!(ModelFaceRestorer::face_region((20, 10), false), (0, 0, 20, 10));
    }

    #[test]
    fn test_zero_upscale_rejected() {
        let mut restorer = restorer();
        let params = EnhanceParams {
            upscale: 0,
            ..EnhanceParams::default()
        };
        assert!(restorer.enhance(&gradient(4, 4), &params).is_err());
    }
}
