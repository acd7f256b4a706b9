use tracing_subscriber::EnvFilter;
use typerace::{DEFAULT_BIND, TyperaceError, TyperaceServer};

#[tokio::main]
async fn main() -> Result<(), TyperaceError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bind = std::env::var("TYPERACE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let server = TyperaceServer::builder().bind(&bind).build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run().await
}
