//! Wiring: a validated config into a ready auth stack.

use crate::api::{ApiClient, AuthApi};
use crate::authenticator::Authenticator;
use crate::session::SessionStore;
use crate::state::AuthStore;
use app_core::{Config, CoreResult, Paths};
use session_vault::{create_vault, BiometricGate, PinPrompt};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything the app layer needs, wired together once at startup.
pub struct AuthStack {
    pub auth: Arc<AuthStore>,
    pub session: Arc<SessionStore>,
    pub authenticator: Authenticator<AuthApi>,
    pub api: ApiClient,
}

/// Build the stack for this host: vault selection, session store, state
/// store, orchestrator, and the authorized API client.
///
/// The gate and PIN prompt come from the caller because they are UI
/// concerns; everything else comes from the config.
pub fn build_stack(
    config: &Config,
    gate: Box<dyn BiometricGate>,
    pin_prompt: Option<Box<dyn PinPrompt>>,
) -> CoreResult<AuthStack> {
    config.validate()?;
    let paths = Paths::new()?;
    paths.ensure_base_dir()?;

    let vault = create_vault(
        gate,
        pin_prompt,
        paths.sim_vault_file(),
        paths.sim_vault_meta_file(),
        Duration::from_millis(config.lock_after_ms),
    );

    let auth = AuthStore::new();
    let session = SessionStore::new(
        Arc::from(vault),
        auth.clone(),
        config.data_service_url.clone(),
    );
    let authenticator = Authenticator::new(
        AuthApi::new(config.data_service_url.clone()),
        session.clone(),
        auth.clone(),
    );
    let api = ApiClient::new(session.clone(), auth.clone());

    info!(service = %config.data_service_url, "auth stack ready");
    Ok(AuthStack {
        auth,
        session,
        authenticator,
        api,
    })
}
