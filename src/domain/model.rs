use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 單週某一榜單上的一本書
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestsellerEntry {
    pub rank: u32,
    pub weeks_on_list: u32,
    pub primary_isbn13: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub bestseller_date: NaiveDate,
    pub category: String,
}

/// 書評文章的摘要欄位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewContent {
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub lead_paragraph: String,
    pub headline: String,
}

impl ReviewContent {
    pub fn is_empty(&self) -> bool {
        self.abstract_text.is_empty() && self.lead_paragraph.is_empty() && self.headline.is_empty()
    }
}

/// 依 ISBN-13 彙總後的一列輸出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBook {
    pub primary_isbn13: String,
    pub best_rank: u32,
    pub max_weeks_on_list: u32,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub latest_bestseller_date: NaiveDate,
    pub review: Option<ReviewContent>,
}

/// 排程中的一列：在 acquisition_date 當天抓取 [start_date, end_date] 的歷史榜單
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionWindow {
    pub acquisition_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AcquisitionWindow {
    /// 輸出檔名，例如 `bestsellers-2014-01-01-to-2014-06-30.csv`
    pub fn output_filename(&self) -> String {
        format!(
            "bestsellers-{}-to-{}.csv",
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// 成功的榜單請求數，只有這個計入每日上限
    pub requests_made: usize,
    pub failed_requests: usize,
    pub limit_reached: bool,
}

#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub entries: Vec<BestsellerEntry>,
    pub stats: ExtractStats,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub books: Vec<AggregatedBook>,
    pub csv_output: String,
}
