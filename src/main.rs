use bookrec_etl::config::toml_config::TomlConfig;
use bookrec_etl::core::{schedule, AcquisitionWindow};
use bookrec_etl::utils::{logger, validation::Validate};
use bookrec_etl::{
    AcquisitionConfig, CliConfig, EtlEngine, EtlError, HistoricalPipeline, LocalStorage,
};
use clap::Parser;

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ Acquisition failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

fn display_plan(window: &AcquisitionWindow, config: &AcquisitionConfig) {
    let sundays = bookrec_etl::core::calendar::sundays_between(window.start_date, window.end_date);
    let list_requests = config.planned_list_requests(window);

    println!("📋 Acquisition Plan:");
    println!("  Window: {} → {}", window.start_date, window.end_date);
    println!("  Weeks: {}", sundays.len());
    println!("  Categories: {}", config.categories.join(", "));
    println!(
        "  List requests: {} (limit {})",
        list_requests, config.daily_request_limit
    );
    println!("  Request delay: {:?}", config.request_delay);
    println!(
        "  Minimum list phase duration: {:?}",
        config.minimum_list_duration(window)
    );
    println!("  Reviews: {}", if config.fetch_reviews { "enabled" } else { "skipped" });
    println!(
        "  Output: {}/{}",
        config.output_path,
        window.output_filename()
    );
    if config.compress_output {
        println!("  Compression: enabled (ZIP)");
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let file_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let log_json = cli.log_json || file_config.as_ref().map(|c| c.log_json()).unwrap_or(false);
    logger::init(cli.verbose, log_json);

    tracing::info!("🚀 Starting historical bestseller acquisition");

    if let Some(file) = &file_config {
        if let Err(e) = file.validate() {
            fail(&e);
        }
    }

    let config = match AcquisitionConfig::resolve(&cli, file_config.as_ref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", AcquisitionConfigSummary(&config));
    }

    let today = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let explicit = cli.start.zip(cli.end);

    let window = match schedule::resolve_window(today, explicit, &config.schedule_path) {
        Ok(Some(window)) => window,
        Ok(None) => {
            tracing::info!("No match for acquisition date.");
            println!("No match for acquisition date.");
            return Ok(());
        }
        Err(e) => fail(&e),
    };

    display_plan(&window, &config);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No API requests will be made");
        return Ok(());
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let monitor = config.monitor;
    let pipeline = HistoricalPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor);

    match engine.run(&window).await {
        Ok(output_path) => {
            tracing::info!("✅ Acquisition completed successfully!");
            println!("✅ Acquisition completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

/// 除錯輸出時遮蔽 API key
struct AcquisitionConfigSummary<'a>(&'a AcquisitionConfig);

impl std::fmt::Debug for AcquisitionConfigSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = self.0;
        f.debug_struct("AcquisitionConfig")
            .field("api_key", &"***")
            .field("books_base_url", &c.books_base_url)
            .field("articles_base_url", &c.articles_base_url)
            .field("schedule_path", &c.schedule_path)
            .field("output_path", &c.output_path)
            .field("categories", &c.categories)
            .field("daily_request_limit", &c.daily_request_limit)
            .field("request_delay", &c.request_delay)
            .field("fetch_reviews", &c.fetch_reviews)
            .finish()
    }
}
