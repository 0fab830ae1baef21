use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned HTTP status {status}")]
    HttpStatusError { status: u16 },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required parameter: {name}")]
    MissingParamError { name: String },

    #[error("Table store error: {message}")]
    TableStoreError { message: String },
}

/// 錯誤分類，用於日誌與診斷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Configuration,
    Storage,
    Data,
}

/// 錯誤嚴重程度，決定 CLI 退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HarvestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::RequestError(_) | HarvestError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            HarvestError::ApiError { .. } => ErrorCategory::Api,
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::MissingParamError { .. } => ErrorCategory::Configuration,
            HarvestError::TableStoreError { .. } | HarvestError::IoError(_) => {
                ErrorCategory::Storage
            }
            HarvestError::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路錯誤通常可重試
            HarvestError::RequestError(_) | HarvestError::HttpStatusError { .. } => {
                ErrorSeverity::Medium
            }
            HarvestError::ApiError { .. }
            | HarvestError::SerializationError(_)
            | HarvestError::TableStoreError { .. } => ErrorSeverity::High,
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::MissingParamError { .. } => ErrorSeverity::High,
            // 本地環境故障
            HarvestError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// 面向使用者的修復建議
    pub fn recovery_suggestion(&self) -> String {
        match self {
            HarvestError::RequestError(_) => {
                "Check your network connection and retry".to_string()
            }
            HarvestError::HttpStatusError { status } if *status == 401 || *status == 403 => {
                "Check that your access token is valid (--token or TABLE_HARVEST_TOKEN)"
                    .to_string()
            }
            HarvestError::HttpStatusError { .. } => {
                "The API endpoint rejected the request; verify the URL and parameters".to_string()
            }
            HarvestError::ApiError { .. } => {
                "The API reported a business error; check parameters and rate limits".to_string()
            }
            HarvestError::IoError(_) => {
                "Check file permissions and free disk space for the tables directory".to_string()
            }
            HarvestError::SerializationError(_) => {
                "The data could not be encoded or decoded; inspect the payload with --verbose"
                    .to_string()
            }
            HarvestError::ConfigError { .. } | HarvestError::ConfigValidationError { .. } => {
                "Fix the configuration and run again".to_string()
            }
            HarvestError::InvalidConfigValueError { field, .. } => {
                format!("Provide a valid value for '{}'", field)
            }
            HarvestError::MissingParamError { name } => {
                format!("Supply the parameter with --param {}=<value>", name)
            }
            HarvestError::TableStoreError { .. } => {
                "Verify the table exists and the tables directory is writable".to_string()
            }
        }
    }

    /// 簡短、不含內部細節的錯誤描述
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Api => format!("API problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => format!("Storage problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
