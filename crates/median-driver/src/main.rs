use config::DriverConfig;

mod backend;
mod config;
mod driver;
mod error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DriverConfig::from_env()?;
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(config.level()?)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::info!(?config, "Loaded the driver configuration");

    let summary = driver::run(config).await?;
    tracing::info!(%summary, "Driver finished");
    Ok(())
}
