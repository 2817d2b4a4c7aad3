use bookrec_etl::core::schedule::{self, AcquisitionSchedule};
use bookrec_etl::utils::logger;
use chrono::NaiveDate;
use clap::Parser;

#[derive(Parser)]
#[command(name = "create-schedule")]
#[command(about = "Write the half-year acquisition schedule CSV")]
struct Args {
    /// First year of bestseller history to fetch
    #[arg(long, default_value_t = schedule::DEFAULT_FIRST_YEAR)]
    first_year: i32,

    /// Last year of bestseller history to fetch
    #[arg(long, default_value_t = schedule::DEFAULT_LAST_YEAR)]
    last_year: i32,

    /// Date on which the first window is fetched (one window per day after that)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Where to write the schedule
    #[arg(short, long, default_value = bookrec_etl::config::DEFAULT_SCHEDULE_PATH)]
    output: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let start = args
        .start
        .unwrap_or_else(schedule::default_first_acquisition_date);

    let schedule = AcquisitionSchedule::generate(args.first_year, args.last_year, start)?;
    schedule.write_to_file(&args.output)?;

    if let (Some(first), Some(last)) = (schedule.windows().first(), schedule.windows().last()) {
        tracing::info!(
            "📅 {} windows, fetched {} through {}",
            schedule.len(),
            first.acquisition_date,
            last.acquisition_date
        );
    }
    println!("✅ Schedule written to {}", args.output);

    Ok(())
}
