use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// バリデーション関連のエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 数値として解析できない入力
    #[error("数値の解析に失敗しました: {field}={value:?}")]
    Parse { field: String, value: String },

    /// リソースが見つからない場合のエラー
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 外部サービス連携でのエラー
    ///
    /// メッセージはサーバーから受け取った文言をそのまま保持する
    #[error("{0}")]
    ExternalService(String),

    /// セッション関連のエラー
    #[error("セッションエラー: {0}")]
    Session(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// データベース関連のエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// I/O関連のエラー
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),

    /// 並行処理関連のエラー
    #[error("並行処理エラー: {0}")]
    Concurrency(String),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（外部サービス一時的エラーなど）
    Medium,
    /// 高重要度（データベースエラーなど）
    High,
}

impl AppError {
    /// ユーザーに表示するためのメッセージを取得
    ///
    /// 外部サービスのエラーはサーバーの文言（例: "Erreur 404"）をそのまま返す
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Parse { field, .. } => format!("{field}は数値で入力してください"),
            AppError::NotFound(resource) => format!("{resource}が見つかりません"),
            AppError::ExternalService(msg) => msg.clone(),
            AppError::Session(_) => "ログイン情報を取得できませんでした".to_string(),
            AppError::Configuration(_) => "設定エラーが発生しました".to_string(),
            AppError::Database(_) => "データベース操作でエラーが発生しました".to_string(),
            AppError::Io(_) => "ファイル操作でエラーが発生しました".to_string(),
            AppError::Json(_) => "データ形式の解析でエラーが発生しました".to_string(),
            AppError::Concurrency(_) => "並行処理でエラーが発生しました".to_string(),
        }
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Validation(_) | AppError::Parse { .. } | AppError::NotFound(_) => {
                ErrorSeverity::Low
            }
            AppError::ExternalService(_) | AppError::Io(_) | AppError::Json(_) => {
                ErrorSeverity::Medium
            }
            AppError::Session(_)
            | AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::Concurrency(_) => ErrorSeverity::High,
        }
    }

    /// バリデーションエラーを作成するヘルパー関数
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// 数値解析エラーを作成するヘルパー関数
    pub fn parse<F: Into<String>, V: Into<String>>(field: F, value: V) -> Self {
        AppError::Parse {
            field: field.into(),
            value: value.into(),
        }
    }

    /// リソース未発見エラーを作成するヘルパー関数（リソース名だけを渡す）
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        AppError::NotFound(resource.into())
    }

    /// 外部サービスエラーを作成するヘルパー関数
    pub fn external_service<S: Into<String>>(message: S) -> Self {
        AppError::ExternalService(message.into())
    }

    /// セッションエラーを作成するヘルパー関数
    pub fn session<S: Into<String>>(message: S) -> Self {
        AppError::Session(message.into())
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    /// 並行処理エラーを作成するヘルパー関数
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        AppError::Concurrency(message.into())
    }
}

/// rusqlite::ErrorからAppErrorへの変換
impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Database(error.to_string())
    }
}

/// reqwest::ErrorからAppErrorへの変換
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::ExternalService(error.to_string())
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        assert_eq!(AppError::validation("テスト").severity(), ErrorSeverity::Low);
        assert_eq!(AppError::parse("amount", "abc").severity(), ErrorSeverity::Low);
        assert_eq!(
            AppError::external_service("Erreur 500").severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            AppError::session("user が未設定").severity(),
            ErrorSeverity::High
        );
    }

    #[test]
    fn test_external_service_message_is_verbatim() {
        // サーバーの文言がそのまま画面に届くこと
        let error = AppError::external_service("Erreur 404");
        assert_eq!(error.to_string(), "Erreur 404");
        assert_eq!(error.user_message(), "Erreur 404");
    }

    #[test]
    fn test_parse_error_names_field() {
        let error = AppError::parse("pct", "vingt");
        assert!(error.to_string().contains("pct"));
        assert!(error.to_string().contains("vingt"));
        assert_eq!(error.user_message(), "pctは数値で入力してください");
    }

    #[test]
    fn test_helper_functions() {
        assert!(matches!(AppError::validation("x"), AppError::Validation(_)));
        assert!(matches!(AppError::not_found("要素"), AppError::NotFound(_)));
        assert!(matches!(
            AppError::configuration("x"),
            AppError::Configuration(_)
        ));
        assert!(matches!(AppError::concurrency("x"), AppError::Concurrency(_)));
    }

    #[test]
    fn test_not_found_message_is_not_repeated() {
        let error = AppError::not_found("要素 data-testid=amount");
        assert_eq!(error.to_string(), "リソースが見つかりません: 要素 data-testid=amount");
        assert_eq!(error.user_message(), "要素 data-testid=amountが見つかりません");
        assert_eq!(error.to_string().matches("見つかりません").count(), 1);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: AppError = json_error.into();
        assert!(matches!(error, AppError::Json(_)));
        assert_eq!(error.severity(), ErrorSeverity::Medium);
    }
}
