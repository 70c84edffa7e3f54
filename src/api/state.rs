//! Application state shared by all handlers

use axum::extract::FromRef;
use crate::config::Settings;
use crate::services::{IdentityVerifier, ServiceFactory};

#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
    pub verifier: IdentityVerifier,
    /// Body limit for completion proof uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(settings: &Settings, services: ServiceFactory) -> Self {
        Self {
            services,
            verifier: IdentityVerifier::new(&settings.identity),
            max_upload_bytes: settings.image_host.max_upload_bytes,
        }
    }
}

impl FromRef<AppState> for IdentityVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
