use std::sync::Arc;
use ticketgate_core::{AdmissionService, Authenticator, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    admission: AdmissionService,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        admission: AdmissionService,
    ) -> Self {
        Self {
            config,
            authenticator,
            admission,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn admission(&self) -> &AdmissionService {
        &self.admission
    }
}
