//! Per-feature request shapes on top of one generic adapter.
//!
//! A [`Feature`] only describes its endpoint, input slots, parameters and
//! result type. Decoding, terminal detection, cancellation and cleanup all
//! live in [`JobDriver`] and are shared by every adapter.

mod steganography;
mod video;
mod watermark;

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use stegomark_core::{JobState, JobView};
use stegomark_logging::stego_debug;

pub use steganography::{
    EmbedMessageOutput, ExtractMessageOutput, MessageEmbed, MessageEmbedParams, MessageExtract,
    MessageExtractParams, MAX_MESSAGE_CHARS,
};
pub use video::{
    EmbedVideoOutput, ExtractVideoOutput, VideoWatermarkEmbed, VideoWatermarkEmbedParams,
    VideoWatermarkExtract, VideoWatermarkExtractParams,
};
pub use watermark::{
    EmbedWatermarkOutput, ExtractWatermarkOutput, ImageWatermarkEmbed, ImageWatermarkEmbedParams,
    ImageWatermarkExtract, ImageWatermarkExtractParams,
};

use crate::driver::{JobDriver, JobWatch};
use crate::request::JobRequest;
use crate::resource::{Preview, PreviewStrategy, SelectedFile};
use crate::{ClientConfig, JobId, SubmitError, ValidationError};

/// A named binary input of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSlot {
    pub field: &'static str,
    pub required: bool,
    pub preview: PreviewStrategy,
}

impl InputSlot {
    pub const fn required(field: &'static str, preview: PreviewStrategy) -> Self {
        Self {
            field,
            required: true,
            preview,
        }
    }

    pub const fn optional(field: &'static str, preview: PreviewStrategy) -> Self {
        Self {
            field,
            required: false,
            preview,
        }
    }
}

pub trait Feature {
    type Params: Default + Clone;
    type Output: DeserializeOwned;

    const NAME: &'static str;
    const ENDPOINT: &'static str;
    /// Form order of the binary parts; scalar fields follow them.
    const INPUTS: &'static [InputSlot];
    /// Selects the video ceiling instead of the image one.
    const LONG_RUNNING: bool = false;

    fn validate(params: &Self::Params) -> Result<(), ValidationError>;

    /// Scalar form fields, already rendered as strings.
    fn fields(params: &Self::Params) -> Vec<(&'static str, String)>;
}

pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field, value })
    }
}

pub struct FeatureAdapter<F: Feature> {
    driver: JobDriver,
    config: Arc<ClientConfig>,
    _feature: PhantomData<fn() -> F>,
}

impl<F: Feature> FeatureAdapter<F> {
    pub fn new(driver: JobDriver, config: Arc<ClientConfig>) -> Self {
        Self {
            driver,
            config,
            _feature: PhantomData,
        }
    }

    /// Select `file` for `slot`, replacing (and releasing) any previous one.
    pub fn select(
        &mut self,
        slot: &str,
        file: SelectedFile,
    ) -> Result<Option<&Preview>, SubmitError> {
        let input = Self::input(slot)?;
        let resource = self
            .driver
            .resources_mut()
            .select(input.field, file, input.preview);
        Ok(resource.preview())
    }

    pub fn clear(&mut self, slot: &str) -> Result<(), SubmitError> {
        let input = Self::input(slot)?;
        self.driver.resources_mut().release(input.field);
        Ok(())
    }

    pub fn selected(&self, slot: &str) -> Option<&SelectedFile> {
        self.driver.resources().get(slot).map(|resource| resource.file())
    }

    pub fn preview(&self, slot: &str) -> Option<&Preview> {
        self.driver
            .resources()
            .get(slot)
            .and_then(|resource| resource.preview())
    }

    /// Validate `params` against the selected inputs and assemble the form.
    pub fn request(&self, params: &F::Params) -> Result<JobRequest, SubmitError> {
        F::validate(params)?;

        let mut request = JobRequest::new(F::ENDPOINT);
        for input in F::INPUTS {
            match self.driver.resources().get(input.field) {
                Some(resource) => {
                    let file = resource.file();
                    request = request.file(input.field, file.name(), file.mime(), file.read()?);
                }
                None if input.required => return Err(SubmitError::MissingInput(input.field)),
                None => {}
            }
        }
        for (name, value) in F::fields(params) {
            request = request.text(name, value);
        }
        Ok(request)
    }

    pub fn submit(&mut self, params: &F::Params) -> Result<JobId, SubmitError> {
        if self.driver.is_pending() {
            return Err(SubmitError::Busy);
        }
        let request = self.request(params)?;
        stego_debug!("{}: submitting {:?}", F::NAME, request.field_names());
        self.driver
            .submit(request, self.config.job_timeout(F::LONG_RUNNING))
    }

    pub fn cancel(&mut self) {
        self.driver.cancel();
    }

    pub fn reset(&mut self) {
        self.driver.reset();
    }

    pub fn state(&self) -> JobState {
        self.driver.state()
    }

    pub fn view(&self) -> JobView {
        self.driver.view()
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.driver.job_id()
    }

    /// Typed result of a succeeded job.
    pub fn result(&self) -> Option<Result<F::Output, serde_json::Error>> {
        self.driver
            .with_state(|state| state.result().map(<F::Output as Deserialize>::deserialize))
    }

    pub async fn wait(&self) -> JobState {
        self.driver.wait().await
    }

    pub fn subscribe(&self) -> JobWatch {
        self.driver.subscribe()
    }

    pub fn driver(&self) -> &JobDriver {
        &self.driver
    }

    fn input(slot: &str) -> Result<&'static InputSlot, SubmitError> {
        F::INPUTS
            .iter()
            .find(|input| input.field == slot)
            .ok_or_else(|| SubmitError::UnknownInput(slot.to_string()))
    }
}
