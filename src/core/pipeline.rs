use crate::core::aggregate::aggregate_by_isbn;
use crate::core::calendar::sundays_between;
use crate::core::nyt_client::NytClient;
use crate::core::{
    AcquisitionWindow, AggregatedBook, ConfigProvider, ExtractResult, ExtractStats, Pipeline,
    Storage, TransformResult,
};
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const CSV_HEADER: [&str; 12] = [
    "",
    "primary_isbn13",
    "best_rank",
    "max_weeks_on_list",
    "publisher",
    "description",
    "title",
    "author",
    "latest_bestseller_date",
    "abstract",
    "lead_paragraph",
    "headline",
];

/// 抓取一個半年區間的歷史榜單，依 ISBN 彙總並補上書評後寫成 CSV
pub struct HistoricalPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: NytClient,
}

impl<S: Storage, C: ConfigProvider> HistoricalPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let client = NytClient::new(
            config.api_key(),
            config.books_base_url(),
            config.articles_base_url(),
        )
        .with_request_delay(config.request_delay())
        .with_request_timeout(config.request_timeout());

        Self {
            storage,
            config,
            client,
        }
    }

    async fn enrich_reviews(&self, books: &mut [AggregatedBook]) {
        let total = books.len();
        for (index, book) in books.iter_mut().enumerate() {
            let urls = self.client.review_urls(&book.primary_isbn13).await;
            let Some(url) = urls.first() else {
                continue;
            };

            tracing::debug!(
                "Fetching review {}/{} for {}: {}",
                index + 1,
                total,
                book.primary_isbn13,
                url
            );
            book.review = Some(self.client.review_content(url).await);
        }
    }
}

pub fn render_csv(books: &[AggregatedBook]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;

    for (index, book) in books.iter().enumerate() {
        let review = book.review.clone().unwrap_or_default();
        wtr.write_record([
            index.to_string(),
            book.primary_isbn13.clone(),
            book.best_rank.to_string(),
            book.max_weeks_on_list.to_string(),
            book.publisher.clone().unwrap_or_default(),
            book.description.clone().unwrap_or_default(),
            book.title.clone().unwrap_or_default(),
            book.author.clone().unwrap_or_default(),
            book.latest_bestseller_date.format("%Y-%m-%d").to_string(),
            review.abstract_text,
            review.lead_paragraph,
            review.headline,
        ])?;
    }

    let bytes = wtr.into_inner().map_err(|e| EtlError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("Output CSV is not valid UTF-8: {}", e),
    })
}

fn zip_single_file(name: &str, data: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    zip.start_file(name, SimpleFileOptions::default())?;
    zip.write_all(data)?;
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for HistoricalPipeline<S, C> {
    async fn extract(&self, window: &AcquisitionWindow) -> Result<ExtractResult> {
        let sundays = sundays_between(window.start_date, window.end_date);
        let categories = self.config.categories();
        let limit = self.config.daily_request_limit();

        tracing::info!(
            "🚀 Fetching {} weeks × {} categories ({} → {})",
            sundays.len(),
            categories.len(),
            window.start_date,
            window.end_date
        );

        let mut entries = Vec::new();
        let mut stats = ExtractStats::default();

        'weeks: for date in &sundays {
            for category in categories {
                if stats.requests_made >= limit {
                    tracing::info!("Reached the daily limit of {} requests.", limit);
                    stats.limit_reached = true;
                    break 'weeks;
                }

                match self.client.fetch_list(*date, category).await {
                    Ok(rows) => {
                        stats.requests_made += 1;
                        tracing::info!("Fetched data for {} - {} (rows {})", date, category, rows.len());
                        entries.extend(rows);
                    }
                    Err(e) => {
                        stats.failed_requests += 1;
                        tracing::error!(
                            "Error fetching data for {} and category {}: {}",
                            date,
                            category,
                            e
                        );
                    }
                }
            }
        }

        tracing::info!(
            "Total requests made: {} (plus {} failed, not counted toward the limit)",
            stats.requests_made,
            stats.failed_requests
        );

        Ok(ExtractResult { entries, stats })
    }

    async fn transform(&self, data: ExtractResult) -> Result<TransformResult> {
        if data.entries.is_empty() {
            tracing::warn!("⚠️ No bestseller rows were fetched; output will only contain a header");
        }

        let mut books = aggregate_by_isbn(&data.entries);
        tracing::info!(
            "Aggregated {} rows into {} books",
            data.entries.len(),
            books.len()
        );

        if self.config.fetch_reviews() {
            self.enrich_reviews(&mut books).await;
            let reviewed = books.iter().filter(|b| b.review.is_some()).count();
            tracing::info!("Attached reviews to {} of {} books", reviewed, books.len());
        }

        let csv_output = render_csv(&books)?;
        Ok(TransformResult { books, csv_output })
    }

    async fn load(&self, window: &AcquisitionWindow, result: TransformResult) -> Result<String> {
        let filename = window.output_filename();

        tracing::debug!(
            "Writing {} books ({} bytes) to {}/{}",
            result.books.len(),
            result.csv_output.len(),
            self.config.output_path(),
            filename
        );
        self.storage
            .write_file(&filename, result.csv_output.as_bytes())
            .await?;

        if self.config.compress_output() {
            let zip_name = format!("{}.zip", filename.trim_end_matches(".csv"));
            // 壓縮實際落地的檔案內容
            let written = self.storage.read_file(&filename).await?;
            let zip_data = zip_single_file(&filename, &written)?;
            self.storage.write_file(&zip_name, &zip_data).await?;
            tracing::info!("🗜️ Compressed copy saved to {}", self.storage.display_path(&zip_name));
        }

        Ok(self.storage.display_path(&filename))
    }
}
