use crate::features::bills::models::{AttachmentForm, Bill, NewBill, UploadResult};
use crate::features::bills::service::{BillsService, Store};
use crate::features::session::{SessionStore, JWT_KEY};
use crate::shared::api_client::ApiClient;
use crate::shared::config::ApiConfig;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::multipart;
use std::sync::Arc;

const BILLS_ENDPOINT: &str = "/bills";

/// Billedバックエンドと通信する経費サービス
pub struct ApiBillsService {
    client: ApiClient,
    session_store: Arc<dyn SessionStore>,
}

impl ApiBillsService {
    pub fn new(client: ApiClient, session_store: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            session_store,
        }
    }

    /// セッションストアに保存されたJWT（未ログインならNone）
    fn token(&self) -> AppResult<Option<String>> {
        let token = self.session_store.get_item(JWT_KEY)?;
        if token.is_none() {
            debug!("JWTが保存されていないため、認証なしでリクエストします");
        }
        Ok(token)
    }
}

/// 添付ファイルのフォームをマルチパートに変換する
fn build_form(form: &AttachmentForm) -> AppResult<multipart::Form> {
    let part = multipart::Part::bytes(form.file.data.clone())
        .file_name(form.file.base_name().to_string())
        .mime_str(&form.file.mime_type)
        .map_err(|e| {
            AppError::validation(format!("MIMEタイプが不正です: {}: {e}", form.file.mime_type))
        })?;

    Ok(multipart::Form::new()
        .part("file", part)
        .text("email", form.email.clone()))
}

/// 経費を一件ずつ変換する（変換できない経費はログに残して除外する）
fn decode_bills(records: Vec<serde_json::Value>) -> Vec<Bill> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let id = record.get("id").cloned();
            match serde_json::from_value::<Bill>(record) {
                Ok(bill) => Some(bill),
                Err(e) => {
                    error!("経費データを変換できないため除外します: index={index}, id={id:?}: {e}");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl BillsService for ApiBillsService {
    async fn list(&self) -> AppResult<Vec<Bill>> {
        let token = self.token()?;
        let records: Vec<serde_json::Value> =
            self.client.get(BILLS_ENDPOINT, token.as_deref()).await?;
        let bills = decode_bills(records);
        info!("経費一覧を受信しました: count={}", bills.len());
        Ok(bills)
    }

    async fn create(&self, form: AttachmentForm) -> AppResult<UploadResult> {
        let token = self.token()?;
        // MIMEタイプの誤りは送信前に検出する
        build_form(&form)?;

        let result: UploadResult = self
            .client
            .post_multipart(BILLS_ENDPOINT, || build_form(&form), token.as_deref())
            .await?;
        info!("領収書を登録しました: key={}", result.key);
        Ok(result)
    }

    async fn update(&self, bill: &NewBill, selector: &str) -> AppResult<Bill> {
        if selector.trim().is_empty() {
            return Err(AppError::validation("更新対象の経費IDが指定されていません"));
        }

        let token = self.token()?;
        let endpoint = format!("{BILLS_ENDPOINT}/{selector}");
        self.client.patch(&endpoint, bill, token.as_deref()).await
    }
}

/// HTTP経由の経費ストア
#[derive(Clone)]
pub struct ApiStore {
    service: Arc<ApiBillsService>,
}

impl ApiStore {
    pub fn new(client: ApiClient, session_store: Arc<dyn SessionStore>) -> Self {
        Self {
            service: Arc::new(ApiBillsService::new(client, session_store)),
        }
    }

    /// 環境変数のAPI設定からストアを作成する
    pub fn from_env(session_store: Arc<dyn SessionStore>) -> AppResult<Self> {
        Ok(Self::new(ApiClient::new()?, session_store))
    }

    pub fn with_config(config: ApiConfig, session_store: Arc<dyn SessionStore>) -> AppResult<Self> {
        Ok(Self::new(ApiClient::new_with_config(config)?, session_store))
    }
}

impl Store for ApiStore {
    fn bills(&self) -> Arc<dyn BillsService> {
        self.service.clone()
    }
}
