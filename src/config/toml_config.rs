use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `bookrec.toml`：所有欄位皆可省略，命令列與環境變數優先
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub acquisition: AcquisitionSection,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub key: Option<String>,
    pub books_base_url: Option<String>,
    pub articles_base_url: Option<String>,
    pub request_delay_seconds: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub daily_request_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquisitionSection {
    pub schedule_path: Option<String>,
    pub categories: Option<Vec<String>>,
    pub fetch_reviews: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: Option<String>,
    pub compress: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_json: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NYT_API_KEY})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ProcessingError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_json(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_json)
            .unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api.books_base_url {
            crate::utils::validation::validate_url("api.books_base_url", url)?;
        }
        if let Some(url) = &self.api.articles_base_url {
            crate::utils::validation::validate_url("api.articles_base_url", url)?;
        }
        if let Some(limit) = self.api.daily_request_limit {
            crate::utils::validation::validate_positive_number("api.daily_request_limit", limit, 1)?;
        }
        if let Some(categories) = &self.acquisition.categories {
            crate::utils::validation::validate_non_empty_list("acquisition.categories", categories)?;
        }
        if let Some(path) = &self.load.output_path {
            crate::utils::validation::validate_path("load.output_path", path)?;
        }
        Ok(())
    }
}
