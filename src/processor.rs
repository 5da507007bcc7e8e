//! Model-backed background removal
//!
//! `BackgroundRemovalProcessor` owns a matting backend and turns decoded
//! images into RGBA cutouts. The HTTP layer keeps one processor behind a mutex
//! and calls it from blocking tasks.

use crate::{
    config::InferenceConfig,
    error::{Result, RetouchError},
    inference::InferenceBackend,
    models::PreprocessingConfig,
    types::{ProcessingTimings, SegmentationMask},
    utils::{ImagePreprocessor, Letterbox, TensorValidator},
};
use image::{DynamicImage, GenericImageView, RgbaImage};
use instant::Instant;
use log::info;
use ndarray::Array4;
use tracing::{debug, instrument};

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// The input with the predicted mask applied as alpha
    pub image: RgbaImage,

    /// The segmentation mask used for removal
    pub mask: SegmentationMask,

    pub timings: ProcessingTimings,
}

/// Background removal processor driving a matting model
pub struct BackgroundRemovalProcessor {
    backend: Box<dyn InferenceBackend>,
    preprocessing: PreprocessingConfig,
}

impl std::fmt::Debug for BackgroundRemovalProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRemovalProcessor")
            .field("preprocessing", &self.preprocessing)
            .field("initialized", &self.backend.is_initialized())
            .finish()
    }
}

impl BackgroundRemovalProcessor {
    /// Initialize the backend and build a processor around it
    ///
    /// # Errors
    /// - Backend initialization or model loading failures
    /// - Invalid preprocessing configuration reported by the backend
    pub fn new(mut backend: Box<dyn InferenceBackend>, inference: &InferenceConfig) -> Result<Self> {
        info!("Initializing background removal processor");
        if let Some(load_time) = backend.initialize(inference)? {
            info!(
                "Matting model ready in {:.0}ms",
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

    /// Preprocessing parameters the backend expects
    #[must_use]
    pub fn preprocessing(&self) -> &PreprocessingConfig {
        &self.preprocessing
    }

    /// Remove the background of a decoded image
    ///
    /// Output dimensions equal input dimensions.
    ///
    /// # Errors
    /// - Image preprocessing failures
    /// - Inference execution errors
    /// - Output tensor with an unexpected shape
    #[instrument(
        skip(self, image),
        fields(dimensions = %format!("{}x{}", image.width(), image.height()))
    )]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        let (output_tensor, preprocessing_ms, inference_ms) = self.predict(image)?;
        timings.preprocessing_ms = preprocessing_ms;
        timings.inference_ms = inference_ms;

        // Mask mapping and alpha application are both postprocessing
        let postprocess_start = Instant::now();
        let mask = Self::tensor_to_mask(&output_tensor, image.dimensions())?;
        let mut result_image = image.to_rgba8();
        mask.apply_to_image(&mut result_image)?;
        timings.postprocessing_ms = postprocess_start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        let stats = mask.statistics();
        debug!(
            foreground_ratio = stats.foreground_ratio,
            inference_ms = timings.inference_ms,
            total_ms = timings.total_ms,
            "Background removed"
        );

        Ok(RemovalResult {
            image: result_image,
            mask,
            timings,
        })
    }

    /// Letterbox and run the model, returning the raw prediction with the
    /// preprocessing and inference times in milliseconds
    fn predict(&mut self, image: &DynamicImage) -> Result<(Array4<f32>, u64, u64)> {
        let preprocess_start = Instant::now();
        let (input_tensor, _) =
            ImagePreprocessor::preprocess_for_inference(image, &self.preprocessing)?;
        let preprocessing_ms = preprocess_start.elapsed().as_millis() as u64;

        let inference_start = Instant::now();
        let output_tensor = self.backend.infer(&input_tensor)?;
        let inference_ms = inference_start.elapsed().as_millis() as u64;

        Ok((output_tensor, preprocessing_ms, inference_ms))
    }

    /// Map a (1, 1, H, W) prediction back onto the original pixel grid
    ///
    /// The letterbox is recomputed from the tensor size, so outputs at a
    /// different resolution than the input canvas still line up.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn tensor_to_mask(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> Result<SegmentationMask> {
        TensorValidator::validate_single_batch_single_channel(tensor)?;
        let (_, _, mask_height, mask_width) = tensor.dim();
        if mask_height != mask_width {
            return Err(RetouchError::processing(format!(
                "Expected a square mask tensor, got {}x{}",
                mask_width, mask_height
            )));
        }

        let letterbox = Letterbox::new(original_dimensions, mask_width as u32)?;
        let (orig_width, orig_height) = original_dimensions;
        let mut data = Vec::with_capacity(orig_width as usize * orig_height as usize);

        for y in 0..orig_height {
            for x in 0..orig_width {
                let (tx, ty) = letterbox.to_canvas(x, y);
                // Outside the prediction area counts as background
                let value = tensor
                    .get([0, 0, ty as usize, tx as usize])
                    .copied()
                    .unwrap_or(0.0);
                data.push((value.clamp(0.0, 1.0) * 255.0) as u8);
            }
        }

        SegmentationMask::new(data, original_dimensions)
    }
}
