pub mod api;
pub mod config;
pub mod observer;

use std::sync::Arc;

use service::{Service, ServiceOptions};
use tokio::net::TcpListener;

use self::{config::Config, observer::Observer};

#[rustfmt::skip]
pub(crate) static SOFTWARE: &str = concat!(
    "sse-push-server.",
    env!("CARGO_PKG_VERSION")
);

/// Create the push service described by the configuration.
pub fn create_service(config: &Config) -> Service<Observer> {
    Service::new(ServiceOptions {
        generator: config.payload.generator(),
        default_interval: config.update_interval,
        buffer_size: config.buffer_size,
        handler: Observer,
    })
}

/// In order to let the integration test directly use the server crate and
/// start the server, a function is opened to replace the main function to
/// directly start the server.
///
/// Runs until ctrl-c is received.
pub async fn startup(config: Arc<Config>) -> anyhow::Result<()> {
    let service = create_service(&config);
    let listener = TcpListener::bind(config.listen()).await?;

    log::info!(
        "push service started: payload={}, default interval={}ms",
        service.payload_kind(),
        config.update_interval
    );

    api::start_server(listener, config, service, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for ctrl-c, err={}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}
