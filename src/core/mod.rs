pub mod aggregate;
pub mod calendar;
pub mod etl;
pub mod nyt_client;
pub mod pipeline;
pub mod schedule;

pub use crate::domain::model::{
    AcquisitionWindow, AggregatedBook, BestsellerEntry, ExtractResult, ExtractStats,
    ReviewContent, TransformResult,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
