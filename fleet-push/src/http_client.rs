use std::{sync::OnceLock, time::Duration};

use tracing::debug;

use crate::{Error, Result};

/// reqwest is built without a bundled crypto provider; install aws-lc-rs once
/// per process before the first client is constructed.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client used for all push service requests.
///
/// `request_timeout` bounds each delivery attempt end to end.
pub fn build_push_client(request_timeout: Duration) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("fleet-push/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(90));

    if request_timeout > Duration::ZERO {
        builder = builder.timeout(request_timeout);
    }

    builder
        .build()
        .map_err(|e| Error::Other(format!("Failed to build reqwest client: {}", e)))
}
