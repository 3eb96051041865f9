use itertools::Itertools;
use nol_crawler::{CrawlerConfig, HttpTransport, Site};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let config = CrawlerConfig::default();
    let site = Site::new(&config, HttpTransport::new(&config.transport)?)?;
    println!("default: {}", site.default_semester()?);
    println!("available: {}", site.list_semesters()?.iter().join(" "));
    Ok(())
}
