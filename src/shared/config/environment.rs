use log::LevelFilter;

/// 実行環境
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// 必須の環境変数が見つからない
#[derive(Debug, Clone)]
pub struct EnvVarError {
    pub var_name: String,
    pub message: String,
}

impl std::fmt::Display for EnvVarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.var_name, self.message)
    }
}

impl std::error::Error for EnvVarError {}

/// 環境変数を読む（起動時の値を優先し、なければビルド時の値を使う）
#[macro_export]
macro_rules! get_env_var {
    ($var_name:expr) => {{
        match std::env::var($var_name) {
            Ok(value) => Ok(value),
            Err(_) => match option_env!($var_name) {
                Some(value) => {
                    log::debug!("{}はビルド時の値を使用します", $var_name);
                    Ok(value.to_string())
                }
                None => Err($crate::shared::config::environment::EnvVarError {
                    var_name: $var_name.to_string(),
                    message: "起動時・ビルド時のどちらにも設定されていません".to_string(),
                }),
            },
        }
    }};
}

/// 環境変数を読む（未設定なら既定値）
#[macro_export]
macro_rules! get_env_var_or_default {
    ($var_name:expr, $default_value:expr) => {{
        $crate::get_env_var!($var_name).unwrap_or_else(|_| {
            log::debug!("{}は未設定のため既定値 {} を使用します", $var_name, $default_value);
            $default_value.to_string()
        })
    }};
}

/// 実行環境とログレベル
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: Environment,
    pub log_level: String,
}

impl EnvironmentConfig {
    pub fn from_env() -> Self {
        let environment = get_environment();
        let fallback = match environment {
            Environment::Development => "debug",
            Environment::Production => "info",
        };
        let log_level = crate::get_env_var_or_default!("LOG_LEVEL", fallback);

        Self {
            environment,
            log_level,
        }
    }

    /// `LOG_LEVEL`をフィルターに変換する（不明な値はinfo）
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// `ENVIRONMENT=production`なら本番、未設定ならビルド種別で判定する
pub fn get_environment() -> Environment {
    match std::env::var("ENVIRONMENT").as_deref() {
        Ok("production") => Environment::Production,
        Ok(_) => Environment::Development,
        Err(_) if cfg!(debug_assertions) => Environment::Development,
        Err(_) => Environment::Production,
    }
}

/// デバッグビルドでは`.env`を読み込む
pub fn load_environment_variables() {
    if !cfg!(debug_assertions) {
        return;
    }

    match dotenv::dotenv() {
        Ok(path) => log::debug!(".envを読み込みました: {}", path.display()),
        Err(e) => log::debug!(".envを読み込みませんでした: {e}"),
    }
}

/// env_loggerを初期化する（二度目以降の呼び出しは何もしない）
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let initialized = env_logger::Builder::from_default_env()
        .filter_level(env_config.level_filter())
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        log::info!(
            "ログ出力を開始しました: level={}, environment={:?}",
            env_config.log_level,
            env_config.environment
        );
    }
}

/// Billedバックエンドへの接続設定
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// 接続失敗時の再試行回数
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5678".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

impl ApiConfig {
    /// `API_SERVER_URL`、`API_TIMEOUT_SECONDS`、`API_MAX_RETRIES`から読み込む
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = crate::get_env_var_or_default!("API_SERVER_URL", defaults.base_url);
        let timeout_seconds = parse_or_warn(
            "API_TIMEOUT_SECONDS",
            crate::get_env_var_or_default!("API_TIMEOUT_SECONDS", defaults.timeout_seconds),
            defaults.timeout_seconds,
        );
        let max_retries = parse_or_warn(
            "API_MAX_RETRIES",
            crate::get_env_var_or_default!("API_MAX_RETRIES", defaults.max_retries),
            defaults.max_retries,
        );

        log::info!(
            "バックエンド接続設定: base_url={base_url}, timeout={timeout_seconds}s, max_retries={max_retries}"
        );

        Self {
            base_url,
            timeout_seconds,
            max_retries,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("API_SERVER_URLが空です".to_string());
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| format!("API_SERVER_URLを解釈できません: {}: {e}", self.base_url))?;
        if self.timeout_seconds == 0 {
            return Err("API_TIMEOUT_SECONDSは1以上にしてください".to_string());
        }
        Ok(())
    }
}

fn parse_or_warn<T: std::str::FromStr + std::fmt::Display>(name: &str, raw: String, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("{name}={raw}を解釈できないため既定値{default}を使用します");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_falls_back_to_info() {
        let config = EnvironmentConfig {
            environment: Environment::Development,
            log_level: "debug".to_string(),
        };
        assert_eq!(config.level_filter(), LevelFilter::Debug);

        let unknown = EnvironmentConfig {
            environment: Environment::Production,
            log_level: "bavard".to_string(),
        };
        assert_eq!(unknown.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_parse_or_warn_uses_default() {
        assert_eq!(parse_or_warn("API_MAX_RETRIES", "5".to_string(), 3u32), 5);
        assert_eq!(parse_or_warn("API_MAX_RETRIES", "cinq".to_string(), 3u32), 3);
    }

    #[test]
    fn test_api_config_default_is_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url, "http://localhost:5678");
    }

    #[test]
    fn test_api_config_validation() {
        let empty = ApiConfig {
            base_url: String::new(),
            ..ApiConfig::default()
        };
        assert!(empty.validate().is_err());

        let malformed = ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(malformed.validate().is_err());

        let zero_timeout = ApiConfig {
            timeout_seconds: 0,
            ..ApiConfig::default()
        };
        assert!(zero_timeout.validate().is_err());
    }
}
