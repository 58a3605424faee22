use martian::dreaming::TickerError;
use martian::driver::{run_together, DriverConfig};

fn main() -> Result<(), TickerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    run_together(DriverConfig::default())?;
    Ok(())
}
