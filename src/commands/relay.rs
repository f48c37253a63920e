//! `fiberscope relay`: run the WebSocket relay until Ctrl-C.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::context::ServiceContext;
use crate::relay::RelayServer;

/// Run the relay command.
///
/// # Errors
///
/// Returns an error string if the configuration is invalid or the relay
/// cannot bind.
pub fn run(
    ctx: &ServiceContext,
    host: Option<String>,
    port: Option<u16>,
    no_echo: bool,
) -> Result<(), String> {
    let config = RelayConfig::from_env()
        .map_err(|e| format!("Invalid configuration: {e}"))?
        .with_overrides(host, port, no_echo);
    let runtime = super::runtime()?;

    runtime.block_on(async {
        let ids = Arc::clone(&ctx.id_gen);
        let server = RelayServer::bind(config.bind_addr(), config.echo_single_client, ids)
            .await
            .map_err(|e| format!("Failed to start relay on {}: {e}", config.bind_addr()))?;
        let addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read relay address: {e}"))?;
        println!("Relay listening on ws://{addr}");
        server
            .run_until(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .map_err(|e| format!("Relay stopped: {e}"))
    })
}
