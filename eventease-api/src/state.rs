use std::sync::Arc;
use eventease_core::enhance::{TextEnhancer, ToneEnhancer};
use eventease_core::identity::IdentityProvider;
use eventease_core::notify::ChangeNotifier;
use eventease_core::{Clock, InquiryRepository};
use eventease_lifecycle::{InquiryQueries, LifecycleEngine, LifecycleRules};

use crate::middleware::auth::JwtIdentityProvider;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    pub queries: Arc<InquiryQueries>,
    pub identity: Arc<dyn IdentityProvider>,
    pub enhancer: Arc<dyn TextEnhancer>,
}

impl AppState {
    /// Wire the engine and query layer over one store.
    pub fn new(
        repo: Arc<dyn InquiryRepository>,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
        rules: LifecycleRules,
        auth: AuthConfig,
    ) -> Self {
        let queries = InquiryQueries::new(repo.clone(), clock.clone(), rules.response_window);
        let engine = LifecycleEngine::new(repo, notifier, clock, rules);
        Self {
            engine: Arc::new(engine),
            queries: Arc::new(queries),
            identity: Arc::new(JwtIdentityProvider::new(&auth.secret)),
            enhancer: Arc::new(ToneEnhancer),
        }
    }
}
