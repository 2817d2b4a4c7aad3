use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 函式庫本身與三個執行檔各自的 tracing target
const CRATE_TARGETS: [&str; 4] = [
    "bookrec_etl",
    "obtain_historical_data",
    "create_schedule",
    "slurm_job",
];

fn filter_directives(verbose: bool) -> String {
    let (fallback, ours) = if verbose { ("info", "debug") } else { ("warn", "info") };
    let mut directives = vec![fallback.to_string()];
    directives.extend(CRATE_TARGETS.iter().map(|t| format!("{}={}", t, ours)));
    directives.join(",")
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(verbose)))
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// 批次作業的輸出會被導向 SLURM 日誌檔，用 JSON 方便事後 grep / jq
pub fn init_batch_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false)
                .json(),
        )
        .init();
}

pub fn init(verbose: bool, json: bool) {
    if json {
        init_batch_logger(verbose);
    } else {
        init_cli_logger(verbose);
    }
}
