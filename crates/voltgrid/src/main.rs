use tracing_subscriber::EnvFilter;
use voltgrid::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let server = match Server::bind(config.clone()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(
                addr = %config.bind_addr,
                error = %e,
                "failed to bind, shutting down"
            );
            std::process::exit(1);
        }
    };

    match server.local_addr() {
        Ok(addr) => tracing::info!("voltgrid online at ws://{addr}/ws"),
        Err(_) => tracing::info!(addr = %config.bind_addr, "voltgrid online"),
    }

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server terminated");
        std::process::exit(1);
    }
}
