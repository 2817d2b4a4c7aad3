use crate::core::{AcquisitionWindow, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// 依序執行 extract → transform → load，回傳輸出檔路徑
    pub async fn run(&self, window: &AcquisitionWindow) -> Result<String> {
        tracing::info!(
            "Starting acquisition for {} → {} (scheduled {})",
            window.start_date,
            window.end_date,
            window.acquisition_date
        );
        self.monitor.log_stats("Start");

        tracing::info!("Extracting bestseller lists...");
        let extracted = self.pipeline.extract(window).await?;
        tracing::info!("Extracted {} list rows", extracted.entries.len());
        self.monitor.log_stats("Extract");

        tracing::info!("Aggregating and enriching...");
        let transformed = self.pipeline.transform(extracted).await?;
        tracing::info!("Transformed into {} books", transformed.books.len());
        self.monitor.log_stats("Transform");

        tracing::info!("Loading...");
        let output_path = self.pipeline.load(window, transformed).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExtractResult, ExtractStats, TransformResult};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct RecordingPipeline {
        phases: Mutex<Vec<&'static str>>,
        fail_transform: bool,
    }

    impl RecordingPipeline {
        fn new(fail_transform: bool) -> Self {
            Self {
                phases: Mutex::new(Vec::new()),
                fail_transform,
            }
        }

        fn record(&self, phase: &'static str) {
            self.phases.lock().unwrap().push(phase);
        }
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self, _window: &AcquisitionWindow) -> Result<ExtractResult> {
            self.record("extract");
            Ok(ExtractResult {
                entries: Vec::new(),
                stats: ExtractStats::default(),
            })
        }

        async fn transform(&self, _data: ExtractResult) -> Result<TransformResult> {
            self.record("transform");
            if self.fail_transform {
                return Err(EtlError::ProcessingError {
                    message: "boom".to_string(),
                });
            }
            Ok(TransformResult {
                books: Vec::new(),
                csv_output: String::new(),
            })
        }

        async fn load(&self, window: &AcquisitionWindow, _result: TransformResult) -> Result<String> {
            self.record("load");
            Ok(window.output_filename())
        }
    }

    fn window() -> AcquisitionWindow {
        AcquisitionWindow {
            acquisition_date: NaiveDate::from_ymd_opt(2024, 7, 6).unwrap(),
            start_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2010, 6, 30).unwrap(),
        }
    }

    #[test]
    fn test_runs_phases_in_order() {
        let engine = EtlEngine::new(RecordingPipeline::new(false));

        let output = tokio_test::block_on(engine.run(&window())).unwrap();

        assert_eq!(output, "bestsellers-2010-01-01-to-2010-06-30.csv");
        assert_eq!(
            *engine.pipeline.phases.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }

    #[test]
    fn test_stops_at_first_failing_phase() {
        let engine = EtlEngine::new_with_monitoring(RecordingPipeline::new(true), true);

        let result = tokio_test::block_on(engine.run(&window()));

        assert!(matches!(result, Err(EtlError::ProcessingError { .. })));
        assert_eq!(
            *engine.pipeline.phases.lock().unwrap(),
            vec!["extract", "transform"]
        );
    }
}
