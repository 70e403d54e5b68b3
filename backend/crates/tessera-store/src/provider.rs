//! Endpoint selection between a raw backend and an optional accelerated one.
//!
//! Data-plane calls (batch reads/writes, point reads) may go through an
//! accelerated endpoint such as a caching cluster. Control-plane calls
//! (table creation, status probes) always use the raw endpoint.

use std::sync::Arc;

use log::info;
use tessera_configs::BackendSettings;

use crate::backend_trait::TableBackend;
use crate::backends::{HttpBackend, HttpBackendConfig, InMemoryBackend};
use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointPreference {
    /// Accelerated endpoint when one is configured and enabled.
    Preferred,
    /// Always the raw endpoint.
    Raw,
}

#[derive(Clone)]
pub struct BackendProvider {
    raw: Arc<dyn TableBackend>,
    accelerated: Option<Arc<dyn TableBackend>>,
    prefer_accelerated: bool,
}

impl BackendProvider {
    pub fn new(raw: Arc<dyn TableBackend>) -> Self {
        Self {
            raw,
            accelerated: None,
            prefer_accelerated: true,
        }
    }

    pub fn with_accelerated(mut self, backend: Arc<dyn TableBackend>) -> Self {
        self.accelerated = Some(backend);
        self
    }

    pub fn prefer_accelerated(mut self, prefer: bool) -> Self {
        self.prefer_accelerated = prefer;
        self
    }

    /// Build backends from `[backend]` settings.
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, BackendError> {
        match settings.kind.as_str() {
            "memory" => {
                info!("Using in-memory table backend");
                Ok(Self::new(Arc::new(InMemoryBackend::new())))
            }
            "http" => {
                let raw = HttpBackend::new(HttpBackendConfig::from_settings(
                    &settings.endpoint,
                    settings,
                ))?;
                info!("Using table service at {}", raw.endpoint());
                let mut provider =
                    Self::new(Arc::new(raw)).prefer_accelerated(settings.prefer_accelerated);

                if let Some(endpoint) = &settings.accelerated_endpoint {
                    let accelerated =
                        HttpBackend::new(HttpBackendConfig::from_settings(endpoint, settings))?;
                    info!(
                        "Accelerated endpoint {} configured (preferred: {})",
                        accelerated.endpoint(),
                        settings.prefer_accelerated
                    );
                    provider = provider.with_accelerated(Arc::new(accelerated));
                }
                Ok(provider)
            }
            other => Err(BackendError::Validation(format!("unknown backend kind '{}'", other))),
        }
    }

    pub fn get(&self, preference: EndpointPreference) -> Arc<dyn TableBackend> {
        match (preference, &self.accelerated) {
            (EndpointPreference::Preferred, Some(accelerated)) if self.prefer_accelerated => {
                accelerated.clone()
            }
            _ => self.raw.clone(),
        }
    }

    /// Backend for data-plane calls.
    pub fn preferred(&self) -> Arc<dyn TableBackend> {
        self.get(EndpointPreference::Preferred)
    }

    /// Backend for control-plane calls.
    pub fn raw(&self) -> Arc<dyn TableBackend> {
        self.get(EndpointPreference::Raw)
    }

    pub fn has_accelerated(&self) -> bool {
        self.accelerated.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_back_to_raw() {
        let provider = BackendProvider::new(Arc::new(InMemoryBackend::new()));
        assert!(!provider.has_accelerated());
        assert_eq!(provider.preferred().name(), "memory");
    }

    #[test]
    fn test_preferred_uses_accelerated() {
        let accelerated: Arc<dyn TableBackend> =
            Arc::new(crate::test_utils::FaultInjectingBackend::new());
        let provider =
            BackendProvider::new(Arc::new(InMemoryBackend::new())).with_accelerated(accelerated);

        assert_eq!(provider.preferred().name(), "fault-injecting");
        assert_eq!(provider.raw().name(), "memory");

        let provider = provider.prefer_accelerated(false);
        assert_eq!(provider.preferred().name(), "memory");
    }

    #[test]
    fn test_from_settings() {
        let settings = BackendSettings::default();
        let provider = BackendProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.raw().name(), "memory");

        let settings = BackendSettings {
            kind: "http".to_string(),
            accelerated_endpoint: Some("http://127.0.0.1:8111".to_string()),
            ..BackendSettings::default()
        };
        let provider = BackendProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.raw().name(), "http://127.0.0.1:8000");
        assert_eq!(provider.preferred().name(), "http://127.0.0.1:8111");
    }
}
