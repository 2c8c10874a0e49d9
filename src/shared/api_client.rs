/// 汎用APIクライアント
///
/// Billedバックエンドとの通信を行う。一時的な接続失敗は指数バックオフでリトライする
use crate::shared::config::environment::ApiConfig;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// APIサーバーからのエラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// 汎用APIクライアント
pub struct ApiClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
}

impl ApiClient {
    /// 環境設定からAPIクライアントを作成
    pub fn new() -> AppResult<Self> {
        Self::new_with_config(ApiConfig::from_env())
    }

    /// 設定を指定してAPIクライアントを作成
    pub fn new_with_config(config: ApiConfig) -> AppResult<Self> {
        config.validate().map_err(AppError::configuration)?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::configuration(format!("ベースURLの解析に失敗: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
        })
    }

    /// エンドポイントの完全なURLを組み立てる
    pub fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| AppError::configuration(format!("URLの組み立てに失敗: {endpoint}: {e}")))
    }

    /// GETリクエストを送信
    pub async fn get<T>(&self, endpoint: &str, auth_token: Option<&str>) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        info!("GETリクエスト送信: endpoint={endpoint}");

        let url = self.endpoint_url(endpoint)?;
        let request = with_auth(self.client.get(url), auth_token);

        self.send_request_with_retry(request, "GET", endpoint).await
    }

    /// PATCHリクエストを送信
    pub async fn patch<B, T>(
        &self,
        endpoint: &str,
        body: &B,
        auth_token: Option<&str>,
    ) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        info!("PATCHリクエスト送信: endpoint={endpoint}");

        let url = self.endpoint_url(endpoint)?;
        let request = with_auth(self.client.patch(url).json(body), auth_token);

        self.send_request_with_retry(request, "PATCH", endpoint)
            .await
    }

    /// マルチパートPOSTリクエストを送信
    ///
    /// `multipart::Form`は複製できないため、試行ごとに`build_form`で作り直す
    pub async fn post_multipart<F, T>(
        &self,
        endpoint: &str,
        build_form: F,
        auth_token: Option<&str>,
    ) -> AppResult<T>
    where
        F: Fn() -> AppResult<multipart::Form>,
        T: DeserializeOwned,
    {
        info!("マルチパートPOSTリクエスト送信: endpoint={endpoint}");

        let url = self.endpoint_url(endpoint)?;
        let mut attempts = 0;
        loop {
            let request = with_auth(
                self.client.post(url.clone()).multipart(build_form()?),
                auth_token,
            );

            match request.send().await {
                Ok(response) => return self.read_response(response, "POST", endpoint).await,
                Err(e) => {
                    if attempts < self.max_retries {
                        attempts += 1;
                        self.backoff(attempts).await;
                        continue;
                    }
                    return Err(AppError::external_service(format!(
                        "APIサーバーへの接続に失敗しました: {e}"
                    )));
                }
            }
        }
    }

    /// リトライ機能付きでリクエストを送信
    async fn send_request_with_retry<T>(
        &self,
        request: RequestBuilder,
        method: &str,
        endpoint: &str,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let mut attempts = 0;
        loop {
            let Some(cloned_request) = request.try_clone() else {
                return Err(AppError::external_service(
                    "リクエストのクローンに失敗しました",
                ));
            };

            match cloned_request.send().await {
                Ok(response) => return self.read_response(response, method, endpoint).await,
                Err(e) => {
                    if attempts < self.max_retries {
                        attempts += 1;
                        self.backoff(attempts).await;
                        continue;
                    }
                    return Err(AppError::external_service(format!(
                        "APIサーバーへの接続に失敗しました: {e}"
                    )));
                }
            }
        }
    }

    async fn backoff(&self, attempts: u32) {
        let delay = Duration::from_secs(2_u64.pow(attempts));
        warn!(
            "APIリクエスト失敗、リトライします: attempt={attempts}/{}, delay={delay:?}",
            self.max_retries
        );
        tokio::time::sleep(delay).await;
    }

    async fn read_response<T>(&self, response: Response, method: &str, endpoint: &str) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        if response.status().is_success() {
            let result: T = response
                .json()
                .await
                .map_err(|e| AppError::external_service(format!("レスポンス解析エラー: {e}")))?;

            info!("{method}リクエスト成功: endpoint={endpoint}");
            return Ok(result);
        }

        Err(AppError::external_service(
            self.handle_error_response(response).await,
        ))
    }

    /// エラーレスポンスから画面に表示する文言を作る
    ///
    /// 構造化されていない場合は `Erreur {status}` とする
    async fn handle_error_response(&self, response: Response) -> String {
        let status_code = response.status().as_u16();
        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "レスポンス読み取り失敗".to_string());

        match serde_json::from_str::<ErrorResponse>(&response_text) {
            Ok(error_response) => {
                debug!(
                    "APIサーバーから構造化エラーレスポンスを受信: status={status_code}, message={}",
                    error_response.message
                );
                format!("Erreur {status_code}: {}", error_response.message)
            }
            Err(_) => {
                warn!(
                    "APIサーバーから非構造化エラーレスポンス: status={status_code}, body={response_text}"
                );
                format!("Erreur {status_code}")
            }
        }
    }
}

/// 認証ヘッダーとリクエストIDを付与する
fn with_auth(request: RequestBuilder, auth_token: Option<&str>) -> RequestBuilder {
    let request = request.header("X-Request-Id", uuid::Uuid::new_v4().to_string());
    match auth_token {
        Some(token) if !token.is_empty() => {
            request.header("Authorization", format!("Bearer {token}"))
        }
        _ => request,
    }
}
