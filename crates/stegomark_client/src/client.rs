use std::sync::Arc;

use tokio::runtime::Handle;

use crate::driver::{JobDriver, ProgressSink};
use crate::features::{
    Feature, FeatureAdapter, ImageWatermarkEmbed, ImageWatermarkExtract, MessageEmbed,
    MessageExtract, VideoWatermarkEmbed, VideoWatermarkExtract,
};
use crate::resource::{PreviewRegistry, ResourceErrorSink, ResourceManager};
use crate::transport::{ReqwestTransport, Transport};
use crate::{ClientConfig, ClientError};

/// Entry point: shared config, transport and preview registry for all adapters.
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    registry: Arc<PreviewRegistry>,
    runtime: Handle,
    sink: Option<Arc<dyn ProgressSink>>,
    resource_errors: Option<Arc<dyn ResourceErrorSink>>,
}

impl Client {
    pub fn new(config: ClientConfig, runtime: Handle) -> Result<Self, ClientError> {
        let config = Arc::new(config);
        let transport = ReqwestTransport::new(config.clone())?;
        Ok(Self::with_transport(config, Arc::new(transport), runtime))
    }

    pub fn with_transport(
        config: Arc<ClientConfig>,
        transport: Arc<dyn Transport>,
        runtime: Handle,
    ) -> Self {
        Self {
            config,
            transport,
            registry: Arc::new(PreviewRegistry::new()),
            runtime,
            sink: None,
            resource_errors: None,
        }
    }

    /// Every adapter created afterwards reports progress to `sink`.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_resource_error_sink(mut self, errors: Arc<dyn ResourceErrorSink>) -> Self {
        self.resource_errors = Some(errors);
        self
    }

    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }

    pub fn adapter<F: Feature>(&self) -> FeatureAdapter<F> {
        let resources = match &self.resource_errors {
            Some(errors) => ResourceManager::with_error_sink(self.registry.clone(), errors.clone()),
            None => ResourceManager::new(self.registry.clone()),
        };
        let mut driver = JobDriver::new(self.runtime.clone(), self.transport.clone(), resources);
        if let Some(sink) = &self.sink {
            driver = driver.with_progress_sink(sink.clone());
        }
        FeatureAdapter::new(driver, self.config.clone())
    }

    pub fn message_embed(&self) -> FeatureAdapter<MessageEmbed> {
        self.adapter()
    }

    pub fn message_extract(&self) -> FeatureAdapter<MessageExtract> {
        self.adapter()
    }

    pub fn image_watermark_embed(&self) -> FeatureAdapter<ImageWatermarkEmbed> {
        self.adapter()
    }

    pub fn image_watermark_extract(&self) -> FeatureAdapter<ImageWatermarkExtract> {
        self.adapter()
    }

    pub fn video_watermark_embed(&self) -> FeatureAdapter<VideoWatermarkEmbed> {
        self.adapter()
    }

    pub fn video_watermark_extract(&self) -> FeatureAdapter<VideoWatermarkExtract> {
        self.adapter()
    }
}
