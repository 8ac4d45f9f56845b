//! dom6api Server - HTTP REST API for game table lookups
//!
//! Reads `.env`, loads the server configuration and serves every configured
//! table until Ctrl+C or SIGTERM.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;

    server::start_server(config).await?;

    Ok(())
}
