use clap::Parser;
use nol_crawler::{
    CrawlerConfig, CrawlerError, HttpTransport, NolCrawler, RetryPolicy, Semester, Site,
    TransportOptions, DEFAULT_BASE_URL, PAGE_SIZE,
};
use std::{
    io::{self, Write},
    process,
    time::Duration,
};
use tracing::error;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Crawl the NTU course listing, one record per line.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Semester such as 103-2 [default: the site's current semester]
    semester: Option<Semester>,

    /// First course index to print
    #[arg(default_value_t = 0)]
    start_index: usize,

    /// Print human-readable records instead of JSON lines
    #[arg(long)]
    pretty: bool,

    /// Look up each course's CEIBA page
    #[arg(long, env = "NOL_ENRICH")]
    enrich: bool,

    #[arg(long, env = "NOL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// First semester using the renumbered periods
    #[arg(long, env = "NOL_PERIOD_BOUNDARY", default_value = "104-1")]
    period_boundary: Semester,

    /// Delay before the first retry, doubling up to --max-retry-delay-ms
    #[arg(long, env = "NOL_RETRY_DELAY_MS", default_value_t = 500)]
    retry_delay_ms: u64,

    #[arg(long, env = "NOL_MAX_RETRY_DELAY_MS", default_value_t = 30_000)]
    max_retry_delay_ms: u64,

    /// Give up after this many attempts per request [default: never]
    #[arg(long, env = "NOL_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    #[arg(long, env = "NOL_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Accept invalid TLS certificates from the site
    #[arg(long, env = "NOL_INSECURE")]
    insecure: bool,
}

impl Args {
    fn config(&self) -> CrawlerConfig {
        CrawlerConfig {
            base_url: self.base_url.clone(),
            enrich: self.enrich,
            period_boundary: self.period_boundary,
            retry: RetryPolicy {
                initial_delay: Duration::from_millis(self.retry_delay_ms),
                max_delay: Duration::from_millis(self.max_retry_delay_ms),
                max_attempts: self.max_attempts,
            },
            transport: TransportOptions {
                timeout: Duration::from_secs(self.timeout_secs),
                accept_invalid_certs: self.insecure,
                ..TransportOptions::default()
            },
        }
    }
}

fn update_progress(now: usize, total: usize) -> io::Result<()> {
    let percent = if total == 0 {
        100.0
    } else {
        now as f64 / total as f64 * 100.0
    };
    let hashes = (percent / 2.0) as usize;
    eprint!(
        "\r({:5}/{:5}) [{}{}] {:6.2}%",
        now,
        total,
        "#".repeat(hashes),
        " ".repeat(50 - hashes),
        percent
    );
    io::stderr().flush()
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.config();
    let semester = match args.semester {
        Some(semester) => semester,
        None => {
            let transport = HttpTransport::new(&config.transport)?;
            Site::new(&config, transport)?.default_semester()?
        }
    };

    let mut crawler = NolCrawler::new(semester, &config)?;
    let count = match crawler.course_count() {
        Ok(count) => count,
        Err(CrawlerError::SemesterNotFound(_)) => {
            eprintln!("No such semester");
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for index in args.start_index..count {
        if index % PAGE_SIZE == 0 {
            update_progress(index, count)?;
        }
        let slot = match crawler.get_course(index) {
            Ok(slot) => slot,
            Err(e) => {
                eprintln!();
                error!("Error at {}: {}", index, e);
                return Err(e.into());
            }
        };

        if args.pretty {
            writeln!(out, "[{}]", index)?;
            writeln!(out, "{}", slot)?;
        } else {
            let mut value = serde_json::to_value(slot)?;
            if let Some(record) = value.as_object_mut() {
                record.insert(".__index__.".to_string(), index.into());
            }
            writeln!(out, "{}", value)?;
        }
    }
    update_progress(count, count)?;
    eprintln!();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();
    run(&args)
}
