use std::sync::Arc;
use ticketline_core::{Authenticator, Config, IngestLoop, SanitizedConfig, TicketPipeline};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    pipeline: Arc<TicketPipeline>,
    ingest: Arc<IngestLoop>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        pipeline: Arc<TicketPipeline>,
        ingest: Arc<IngestLoop>,
    ) -> Self {
        Self {
            config,
            authenticator,
            pipeline,
            ingest,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn pipeline(&self) -> &TicketPipeline {
        self.pipeline.as_ref()
    }

    pub fn ingest(&self) -> &IngestLoop {
        self.ingest.as_ref()
    }
}
