//! Service wiring: account store, token codec, revocations, gate and sessions.

use std::sync::Arc;

use castle_auth::{
    AccessGate, PrincipalDirectory, RevocationRegistry, SessionService, TokenCodec, TokenTtls,
};
use castle_infra::{AccountStore, InMemoryAccountStore, PostgresAccountStore};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<dyn AccountStore>,
    pub codec: Arc<TokenCodec>,
    pub revocations: Arc<RevocationRegistry>,
    pub gate: AccessGate,
    pub sessions: SessionService,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("gate", &self.gate)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    /// Wire every component around one account store.
    pub fn assemble<S>(store: Arc<S>, secret: &str, ttls: TokenTtls) -> Self
    where
        S: AccountStore + 'static,
    {
        let codec = Arc::new(TokenCodec::new(secret, ttls));
        let revocations = Arc::new(RevocationRegistry::new());
        let directory: Arc<dyn PrincipalDirectory> = store.clone();

        Self {
            gate: AccessGate::new(codec.clone(), revocations.clone(), directory.clone()),
            sessions: SessionService::new(codec.clone(), revocations.clone(), directory),
            accounts: store,
            codec,
            revocations,
        }
    }

    /// In-memory store; used by tests and local runs.
    pub fn in_memory(secret: &str, ttls: TokenTtls) -> Self {
        Self::assemble(Arc::new(InMemoryAccountStore::new()), secret, ttls)
    }
}

/// Pick the account store from configuration.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let ttls = config.token_ttls();

    match (&config.database_url, config.use_persistent_stores) {
        (Some(url), true) => {
            let store = PostgresAccountStore::connect(url).await?;
            tracing::info!("using postgres account store");
            Ok(AppServices::assemble(Arc::new(store), &config.jwt_secret, ttls))
        }
        _ => {
            tracing::info!("using in-memory account store");
            Ok(AppServices::in_memory(&config.jwt_secret, ttls))
        }
    }
}
