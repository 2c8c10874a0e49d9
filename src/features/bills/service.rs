use crate::features::bills::models::{AttachmentForm, Bill, NewBill, UploadResult};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use std::sync::Arc;

/// リモートの経費サービス
///
/// 実装はモック（テスト用）とHTTP（Billedバックエンド）の二つ
#[async_trait]
pub trait BillsService: Send + Sync {
    /// ログイン中のユーザーが参照できる経費の一覧
    async fn list(&self) -> AppResult<Vec<Bill>>;

    /// 領収書をアップロードし、ファイルURLと経費のキーを受け取る
    async fn create(&self, form: AttachmentForm) -> AppResult<UploadResult>;

    /// `selector`で指定した経費を送信内容で更新する
    async fn update(&self, bill: &NewBill, selector: &str) -> AppResult<Bill>;
}

/// `bills()`アクセサを公開するストア
pub trait Store: Send + Sync {
    fn bills(&self) -> Arc<dyn BillsService>;
}
