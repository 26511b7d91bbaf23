pub mod config;
mod errors;
mod headers;
mod http;
pub mod metrics_defs;
mod proxy_service;
mod router;
mod upstreams;

pub use errors::ProxyError;
pub use proxy_service::GatewayService;

use identity::Authenticator;
use identity::client::{IdentityServiceClient, KeyServiceClient};
use shared::admin_service::AdminService;
use shared::http::{run_http_service, serve_listener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;

/// Runs the gateway listener and the admin listener until either fails.
pub async fn run(config: config::Config) -> Result<(), ProxyError> {
    config.validate()?;

    let validator = KeyServiceClient::new(&config.key_service)?;
    let resolver = IdentityServiceClient::new(&config.identity_service)?;
    let authenticator = Authenticator::new(Arc::new(validator), Arc::new(resolver));
    let gateway = GatewayService::new(&config, authenticator);

    let listener = TcpListener::bind(format!(
        "{}:{}",
        config.listener.host, config.listener.port
    ))
    .await?;

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        routes = config.routes.len(),
        "Gateway listening"
    );

    // Ready once the gateway socket is bound.
    let ready = Arc::new(AtomicBool::new(true));
    let admin_ready = ready.clone();
    let admin = AdminService::new(move || admin_ready.load(Ordering::Relaxed));

    let gateway_task = serve_listener::<_, _, ProxyError>(listener, gateway);
    let admin_task = run_http_service::<_, _, ProxyError>(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin,
    );

    let result = tokio::try_join!(gateway_task, admin_task).map(|_| ());
    ready.store(false, Ordering::Relaxed);
    result
}
