#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use pki_scheduler::{AppConfig, SqliteClassStore, http_api};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let store = SqliteClassStore::new(&config.database_path)?;

    println!(
        "pki-scheduler HTTP API listening on http://{} (database {})",
        config.http_addr,
        config.database_path.display()
    );
    http_api::serve(config.http_addr, store, config.upload_limit).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
