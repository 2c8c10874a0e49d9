pub mod features;
pub mod shared;

use log::info;
use shared::config::{initialize_logging_system, load_environment_variables, EnvironmentConfig};

/// 環境変数とログシステムを初期化する
///
/// ホストアプリケーションの起動時に一度だけ呼び出す。複数回呼び出しても安全
pub fn initialize() -> EnvironmentConfig {
    load_environment_variables();
    initialize_logging_system();

    let config = EnvironmentConfig::from_env();
    info!(
        "Billedを初期化しました: environment={:?}, log_level={}",
        config.environment, config.log_level
    );
    config
}
