/// 経費機能モジュール
///
/// このモジュールは経費の申請ワークフローに関連する機能を提供します：
/// - 経費一覧の取得と表示用の整形
/// - 領収書のアップロードと新規経費の送信
/// - リモート経費サービス（モック・HTTP）
/// - 送信した経費の保存の再試行
// サブモジュールの宣言
pub mod api_store;
pub mod list_controller;
pub mod mock;
pub mod models;
pub mod new_bill_controller;
pub mod retry_queue;
pub mod service;

mod integration_tests;

// モデル
pub use models::{
    AttachmentForm, Bill, BillStatus, DisplayBill, NewBill, ReceiptFile, UploadResult, UploadedReceipt,
    DEFAULT_PCT, EXPENSE_TYPES,
};

// コントローラー
pub use list_controller::BillsController;
pub use new_bill_controller::{is_allowed_receipt, DraftState, NewBillController};

// サービスとストア
pub use api_store::{ApiBillsService, ApiStore};
pub use mock::{MockBillsService, MockStore};
pub use retry_queue::{FailedUpdate, ReceiptStatus, RetryPolicy, RetryQueue, SubmitTicket};
pub use service::{BillsService, Store};
