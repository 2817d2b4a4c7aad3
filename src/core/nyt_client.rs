use crate::domain::model::{BestsellerEntry, ReviewContent};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(12);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ListResponse {
    results: ListResults,
}

#[derive(Debug, Deserialize)]
struct ListResults {
    #[serde(default)]
    books: Vec<ListBook>,
}

#[derive(Debug, Deserialize)]
struct ListBook {
    rank: u32,
    #[serde(default)]
    weeks_on_list: u32,
    primary_isbn13: Option<String>,
    publisher: Option<String>,
    description: Option<String>,
    title: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewsResponse {
    status: Option<String>,
    #[serde(default)]
    num_results: u64,
    #[serde(default)]
    results: Vec<ReviewLink>,
}

#[derive(Debug, Deserialize)]
struct ReviewLink {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ArticleSearchResponse {
    status: Option<String>,
    response: Option<ArticleDocs>,
}

#[derive(Debug, Deserialize)]
struct ArticleDocs {
    #[serde(default)]
    docs: Vec<ArticleDoc>,
}

#[derive(Debug, Deserialize)]
struct ArticleDoc {
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    lead_paragraph: Option<String>,
    headline: Option<Headline>,
}

#[derive(Debug, Deserialize)]
struct Headline {
    main: Option<String>,
}

/// NYT Books / Article Search API 的薄封裝。
///
/// 每個請求之後都會固定暫停 `request_delay`，免費金鑰每分鐘只允許 5 次請求。
#[derive(Debug, Clone)]
pub struct NytClient {
    client: Client,
    api_key: String,
    books_base_url: String,
    articles_base_url: String,
    request_delay: Duration,
    request_timeout: Duration,
}

impl NytClient {
    pub fn new(api_key: &str, books_base_url: &str, articles_base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            books_base_url: books_base_url.trim_end_matches('/').to_string(),
            articles_base_url: articles_base_url.trim_end_matches('/').to_string(),
            request_delay: DEFAULT_REQUEST_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `{books}/lists/{date}/{category}.json`
    pub fn list_url(&self, date: NaiveDate, category: &str) -> Result<Url> {
        let mut url = parse_base(&self.books_base_url)?;
        url.path_segments_mut()
            .map_err(|_| EtlError::InvalidConfigValueError {
                field: "books_base_url".to_string(),
                value: self.books_base_url.clone(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push("lists")
            .push(&date.format("%Y-%m-%d").to_string())
            .push(&format!("{}.json", category));
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        tracing::debug!("GET {}", url);
        let result = self
            .client
            .get(url.clone())
            .query(query)
            .query(&[("api-key", self.api_key.as_str())])
            .timeout(self.request_timeout)
            .send()
            .await;

        // 失敗的請求同樣計入速率限制
        self.pause().await;

        let response = result?;
        if !response.status().is_success() {
            return Err(EtlError::HttpStatusError {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    /// 抓取某週某榜單；非 2xx 回應視為錯誤交給呼叫端處理
    pub async fn fetch_list(&self, date: NaiveDate, category: &str) -> Result<Vec<BestsellerEntry>> {
        let url = self.list_url(date, category)?;
        let response = self.get(url, &[]).await?;
        let body: ListResponse = response.json().await?;

        Ok(body
            .results
            .books
            .into_iter()
            .map(|book| BestsellerEntry {
                rank: book.rank,
                weeks_on_list: book.weeks_on_list,
                primary_isbn13: book.primary_isbn13,
                publisher: book.publisher,
                description: book.description,
                title: book.title,
                author: book.author,
                bestseller_date: date,
                category: category.to_string(),
            })
            .collect())
    }

    /// 以 ISBN-13 查書評連結；任何失敗都回傳空集合
    pub async fn review_urls(&self, isbn13: &str) -> Vec<String> {
        match self.try_review_urls(isbn13).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!("Review lookup failed for ISBN {}: {}", isbn13, e);
                Vec::new()
            }
        }
    }

    async fn try_review_urls(&self, isbn13: &str) -> Result<Vec<String>> {
        let url = parse_base(&format!("{}/reviews.json", self.books_base_url))?;
        let response = self.get(url, &[("isbn", isbn13)]).await?;
        let body: ReviewsResponse = response.json().await?;

        if body.status.as_deref() != Some("OK") {
            tracing::warn!("Unexpected review response status for ISBN {}: {:?}", isbn13, body.status);
            return Ok(Vec::new());
        }
        if body.num_results == 0 {
            tracing::info!("No results found for ISBN: {}", isbn13);
            return Ok(Vec::new());
        }

        let mut urls: Vec<String> = Vec::new();
        for link in body.results {
            if !urls.contains(&link.url) {
                urls.push(link.url);
            }
        }
        Ok(urls)
    }

    /// 以文章網址查摘要、導言與標題；任何失敗都回傳空內容
    pub async fn review_content(&self, article_url: &str) -> ReviewContent {
        match self.try_review_content(article_url).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Article lookup failed for {}: {}", article_url, e);
                ReviewContent::default()
            }
        }
    }

    async fn try_review_content(&self, article_url: &str) -> Result<ReviewContent> {
        let url = parse_base(&format!("{}/articlesearch.json", self.articles_base_url))?;
        let filter = format!("web_url:(\"{}\")", article_url);
        let response = self.get(url, &[("fq", filter.as_str())]).await?;
        let body: ArticleSearchResponse = response.json().await?;

        if body.status.as_deref() != Some("OK") {
            return Ok(ReviewContent::default());
        }

        let doc = body.response.and_then(|r| r.docs.into_iter().next());
        Ok(match doc {
            Some(doc) => ReviewContent {
                abstract_text: doc.abstract_text.unwrap_or_default(),
                lead_paragraph: doc.lead_paragraph.unwrap_or_default(),
                headline: doc.headline.and_then(|h| h.main).unwrap_or_default(),
            },
            None => ReviewContent::default(),
        })
    }
}

fn parse_base(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| EtlError::InvalidConfigValueError {
        field: "base_url".to_string(),
        value: url.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })
}
