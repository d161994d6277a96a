//! Shared types for the API layer.

use std::sync::Arc;

use crate::core_state::CoreState;
use crate::prescription_pdf::PdfTheme;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub pdf_theme: Arc<PdfTheme>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        let pdf_theme = Arc::new(PdfTheme::from_config(&core.config));
        Self { core, pdf_theme }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.core.config.token_ttl_hours)
    }
}

/// The bearer token of the current request, injected next to `AuthUser`
/// so logout can revoke it.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);
