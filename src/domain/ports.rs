use crate::domain::model::{AcquisitionWindow, ExtractResult, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 給使用者看的完整路徑
    fn display_path(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn api_key(&self) -> &str;
    fn books_base_url(&self) -> &str;
    fn articles_base_url(&self) -> &str;
    fn output_path(&self) -> &str;
    fn categories(&self) -> &[String];
    fn daily_request_limit(&self) -> usize;
    fn request_delay(&self) -> Duration;
    fn request_timeout(&self) -> Duration;
    fn fetch_reviews(&self) -> bool;
    fn compress_output(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, window: &AcquisitionWindow) -> Result<ExtractResult>;
    async fn transform(&self, data: ExtractResult) -> Result<TransformResult>;
    async fn load(&self, window: &AcquisitionWindow, result: TransformResult) -> Result<String>;
}
