use serde::{Deserialize, Serialize};

use super::{check_range, Feature, InputSlot};
use crate::resource::PreviewStrategy;
use crate::ValidationError;

pub(crate) const ALPHA_RANGE: (f64, f64) = (0.01, 0.5);
pub(crate) const ARNOLD_RANGE: (u32, u32) = (1, 20);
pub(crate) const WATERMARK_SIZE_RANGE: (u32, u32) = (16, 128);

pub(crate) fn check_alpha(alpha: f64) -> Result<(), ValidationError> {
    check_range("alpha", alpha, ALPHA_RANGE.0, ALPHA_RANGE.1)
}

pub(crate) fn check_arnold(iterations: u32) -> Result<(), ValidationError> {
    check_range(
        "arnold_iterations",
        f64::from(iterations),
        f64::from(ARNOLD_RANGE.0),
        f64::from(ARNOLD_RANGE.1),
    )
}

pub(crate) fn check_watermark_size(size: u32) -> Result<(), ValidationError> {
    check_range(
        "watermark_size",
        f64::from(size),
        f64::from(WATERMARK_SIZE_RANGE.0),
        f64::from(WATERMARK_SIZE_RANGE.1),
    )
}

pub struct ImageWatermarkEmbed;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageWatermarkEmbedParams {
    /// Embedding strength.
    pub alpha: f64,
    pub arnold_iterations: u32,
}

impl Default for ImageWatermarkEmbedParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            arnold_iterations: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedWatermarkOutput {
    pub success: bool,
    pub watermark_size: String,
    pub blocks_used: u64,
    pub alpha: f64,
    pub arnold_iterations: u32,
    pub psnr: f64,
    pub ssim: f64,
    pub watermarked_image: String,
}

impl Feature for ImageWatermarkEmbed {
    type Params = ImageWatermarkEmbedParams;
    type Output = EmbedWatermarkOutput;

    const NAME: &'static str = "image watermark embed";
    const ENDPOINT: &'static str = "/api/watermarking/embed";
    const INPUTS: &'static [InputSlot] = &[
        InputSlot::required("host_image", PreviewStrategy::Inline),
        InputSlot::required("watermark_image", PreviewStrategy::Inline),
    ];

    fn validate(params: &Self::Params) -> Result<(), ValidationError> {
        check_alpha(params.alpha)?;
        check_arnold(params.arnold_iterations)
    }

    fn fields(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![
            ("alpha", params.alpha.to_string()),
            ("arnold_iterations", params.arnold_iterations.to_string()),
        ]
    }
}

pub struct ImageWatermarkExtract;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWatermarkExtractParams {
    /// Side length in pixels of the square watermark.
    pub watermark_size: u32,
    pub arnold_iterations: u32,
}

impl Default for ImageWatermarkExtractParams {
    fn default() -> Self {
        Self {
            watermark_size: 64,
            arnold_iterations: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractWatermarkOutput {
    pub success: bool,
    pub extracted_watermark: String,
    pub size: u32,
    /// Normalized cross-correlation, present when an original watermark was sent.
    pub nc: Option<f64>,
}

impl Feature for ImageWatermarkExtract {
    type Params = ImageWatermarkExtractParams;
    type Output = ExtractWatermarkOutput;

    const NAME: &'static str = "image watermark extract";
    const ENDPOINT: &'static str = "/api/watermarking/extract";
    const INPUTS: &'static [InputSlot] = &[
        InputSlot::required("watermarked_image", PreviewStrategy::Inline),
        InputSlot::required("original_image", PreviewStrategy::Inline),
        InputSlot::optional("original_watermark", PreviewStrategy::Inline),
    ];

    fn validate(params: &Self::Params) -> Result<(), ValidationError> {
        check_watermark_size(params.watermark_size)?;
        check_arnold(params.arnold_iterations)
    }

    fn fields(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![
            ("watermark_size", params.watermark_size.to_string()),
            ("arnold_iterations", params.arnold_iterations.to_string()),
        ]
    }
}
