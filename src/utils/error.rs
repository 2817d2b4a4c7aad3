use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Cannot read acquisition schedule '{path}': {message}")]
    ScheduleFileError { path: String, message: String },

    #[error("Job script error at line {line}: {message}")]
    JobScriptError { line: usize, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Storage,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::ScheduleFileError { .. }
            | EtlError::JobScriptError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常重跑即可
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::HttpStatusError { status: 401, .. }
            | EtlError::HttpStatusError { status: 403, .. } => {
                "Check that NYT_API_KEY is valid and enabled for the Books and Article Search APIs"
                    .to_string()
            }
            EtlError::HttpStatusError { status: 429, .. } => {
                "Daily quota exhausted; lower --daily-limit or raise --request-delay and rerun tomorrow"
                    .to_string()
            }
            EtlError::MissingConfigError { field } => {
                format!("Set {} in the environment or the TOML config file", field)
            }
            EtlError::ScheduleFileError { path, .. } => format!(
                "Run `create-schedule --output {}` or pass --schedule with an existing schedule CSV",
                path
            ),
            EtlError::JobScriptError { .. } => {
                "Compare the script with `slurm-job render --preset daily`".to_string()
            }
            _ => match self.category() {
                ErrorCategory::Network => "Check network connectivity and the API base URLs".to_string(),
                ErrorCategory::Data => "Inspect the API response or the schedule CSV for malformed rows".to_string(),
                ErrorCategory::Storage => "Check that the output directory exists and is writable".to_string(),
                ErrorCategory::Configuration => "Review the command line flags and config file".to_string(),
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("無法連線至 API: {}", self),
            ErrorCategory::Data => format!("資料處理失敗: {}", self),
            ErrorCategory::Storage => format!("檔案寫入失敗: {}", self),
            ErrorCategory::Configuration => format!("配置錯誤: {}", self),
        }
    }

    /// 依嚴重程度決定行程結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
