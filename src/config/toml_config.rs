use crate::domain::model::{Fees, Locality, Money, UserId};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, ShopError};
use crate::utils::validation::{validate_at_least, validate_non_empty_string, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub fees: FeesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub user_id: Option<i64>,
    pub locality: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeesConfig {
    pub delivery: Option<Money>,
    pub platform: Option<Money>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_seconds: None,
            },
            session: SessionConfig::default(),
            fees: FeesConfig::default(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ShopError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ShopError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FOOD_ORDER_BACKEND})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ShopError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("backend.base_url", &self.backend.base_url)?;

        if let Some(timeout) = self.backend.timeout_seconds {
            validate_at_least("backend.timeout_seconds", timeout, 1)?;
        }

        if let Some(user_id) = self.session.user_id {
            validate_at_least("session.user_id", user_id, 1)?;
        }

        if let Some(locality) = &self.session.locality {
            validate_non_empty_string("session.locality", locality)?;
            if !Locality::new(locality.as_str()).is_known() {
                tracing::warn!("⚠️ session.locality '{}' is not a known locality", locality);
            }
        }

        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn base_url(&self) -> &str {
        &self.backend.base_url
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn default_user_id(&self) -> UserId {
        UserId(self.session.user_id.unwrap_or(1))
    }

    fn default_locality(&self) -> Locality {
        self.session
            .locality
            .as_ref()
            .map(Locality::new)
            .unwrap_or_default()
    }

    fn fees(&self) -> Fees {
        let defaults = Fees::default();
        Fees {
            delivery: self.fees.delivery.unwrap_or(defaults.delivery),
            platform: self.fees.platform.unwrap_or(defaults.platform),
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
