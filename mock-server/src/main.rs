use std::sync::Arc;

use mock_extension::{
    listen_port, Extension, Fixture, FIXTURE_ENV, PORT_ENV, SESSION_TOKEN_ENV,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = listen_port(std::env::var(PORT_ENV).ok().as_deref())?;
    let token = std::env::var(SESSION_TOKEN_ENV).unwrap_or_default();
    let fixture = match std::env::var(FIXTURE_ENV) {
        Ok(path) => serde_json::from_str::<Fixture>(&std::fs::read_to_string(path)?)?,
        Err(_) => Fixture::default(),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    mock_extension::run(listener, Arc::new(Extension::from_fixture(token, fixture))).await?;
    Ok(())
}
