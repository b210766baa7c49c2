use rimgen::{logger, AppConfig, InferenceClient};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = AppConfig::from_env();
    logger::init_with_config(logger::LoggerConfig::for_app(&config))?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &config);
    logger::log_config_info(&config);

    if config.token().is_none() {
        log::warn!("⚠️  HF_API_TOKEN is missing; generation requests will be rejected");
    }

    let client = match InferenceClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Failed to initialize inference client: {}", e);
            return Err(e.into());
        }
    };

    match client.storage().health_check().await {
        Ok(true) => {}
        Ok(false) => log::warn!(
            "⚠️  Images directory {} is not writable",
            client.config().images_dir.display()
        ),
        Err(e) => log::warn!("⚠️  Images directory check failed: {}", e),
    }

    rimgen::server::run(client).await?;
    Ok(())
}
