use serde::{Deserialize, Serialize};

use super::watermark::{check_alpha, check_arnold, check_watermark_size};
use super::{check_positive, check_range, Feature, InputSlot};
use crate::resource::PreviewStrategy;
use crate::ValidationError;

const FRAME_SKIP_RANGE: (u32, u32) = (1, 10);

pub struct VideoWatermarkEmbed;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoWatermarkEmbedParams {
    pub alpha: f64,
    /// Watermark every n-th frame.
    pub frame_skip: u32,
    pub arnold_iterations: u32,
    pub use_scene_detection: bool,
    pub scene_threshold: f64,
}

impl Default for VideoWatermarkEmbedParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            frame_skip: 5,
            arnold_iterations: 10,
            use_scene_detection: true,
            scene_threshold: 30.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedVideoOutput {
    pub success: bool,
    pub total_frames: u64,
    pub watermarked_frames: u64,
    pub scene_changes_detected: Option<u64>,
    pub scene_changes_watermarked: Option<u64>,
    pub fps: f64,
    pub resolution: String,
    pub frame_skip: u32,
    pub scene_detection_enabled: Option<bool>,
    pub efficiency_improvement: Option<String>,
    pub watermarked_video: String,
}

impl Feature for VideoWatermarkEmbed {
    type Params = VideoWatermarkEmbedParams;
    type Output = EmbedVideoOutput;

    const NAME: &'static str = "video watermark embed";
    const ENDPOINT: &'static str = "/api/video/embed";
    const INPUTS: &'static [InputSlot] = &[
        InputSlot::required("video", PreviewStrategy::Handle),
        InputSlot::required("watermark", PreviewStrategy::Inline),
    ];
    const LONG_RUNNING: bool = true;

    fn validate(params: &Self::Params) -> Result<(), ValidationError> {
        check_alpha(params.alpha)?;
        check_range(
            "frame_skip",
            f64::from(params.frame_skip),
            f64::from(FRAME_SKIP_RANGE.0),
            f64::from(FRAME_SKIP_RANGE.1),
        )?;
        check_arnold(params.arnold_iterations)?;
        check_positive("scene_threshold", params.scene_threshold)
    }

    fn fields(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![
            ("alpha", params.alpha.to_string()),
            ("frame_skip", params.frame_skip.to_string()),
            ("arnold_iterations", params.arnold_iterations.to_string()),
            ("use_scene_detection", params.use_scene_detection.to_string()),
            ("scene_threshold", params.scene_threshold.to_string()),
        ]
    }
}

pub struct VideoWatermarkExtract;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoWatermarkExtractParams {
    pub frame_number: u32,
    pub watermark_size: u32,
    pub arnold_iterations: u32,
}

impl Default for VideoWatermarkExtractParams {
    fn default() -> Self {
        Self {
            frame_number: 0,
            watermark_size: 64,
            arnold_iterations: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractVideoOutput {
    pub success: bool,
    pub extracted_watermark: String,
    pub frame_number: u32,
    pub watermark_size: u32,
}

impl Feature for VideoWatermarkExtract {
    type Params = VideoWatermarkExtractParams;
    type Output = ExtractVideoOutput;

    const NAME: &'static str = "video watermark extract";
    const ENDPOINT: &'static str = "/api/video/extract";
    const INPUTS: &'static [InputSlot] = &[
        InputSlot::required("watermarked_video", PreviewStrategy::Handle),
        InputSlot::required("original_video", PreviewStrategy::Handle),
    ];
    const LONG_RUNNING: bool = true;

    fn validate(params: &Self::Params) -> Result<(), ValidationError> {
        check_watermark_size(params.watermark_size)?;
        check_arnold(params.arnold_iterations)
    }

    fn fields(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![
            ("frame_number", params.frame_number.to_string()),
            ("watermark_size", params.watermark_size.to_string()),
            ("arnold_iterations", params.arnold_iterations.to_string()),
        ]
    }
}
