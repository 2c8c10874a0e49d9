/// 新規経費フォームのコントローラー
///
/// 領収書のアップロードとフォーム送信を扱う。送信後の保存は再試行キューに任せ、
/// 画面はすぐに一覧へ戻る
use crate::features::bills::models::{
    AttachmentForm, BillStatus, NewBill, UploadedReceipt, DEFAULT_PCT,
};
use crate::features::bills::retry_queue::{ReceiptStatus, RetryQueue, SubmitTicket};
use crate::features::bills::service::Store;
use crate::features::dom::{ChangeEvent, Document, SubmitEvent};
use crate::features::navigation::{OnNavigate, Route};
use crate::features::session::Session;
use crate::features::views::new_bill_ui::{
    AMOUNT_ID, COMMENTARY_ID, DATEPICKER_ID, ERROR_ID, EXPENSE_NAME_ID, EXPENSE_TYPE_ID,
    FORM_ERROR_ID, PCT_ID, VAT_ID,
};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{parse_integer, parse_optional_number};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// 受け付ける領収書の拡張子
static ALLOWED_EXTENSION: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|png)$"));

/// 領収書ファイル名の拡張子が受け付け可能か（大文字小文字を区別しない）
pub fn is_allowed_receipt(file_name: &str) -> bool {
    match ALLOWED_EXTENSION.as_ref() {
        Ok(pattern) => pattern.is_match(file_name),
        Err(e) => {
            error!("拡張子パターンのコンパイルに失敗しました: {e}");
            false
        }
    }
}

/// 入力中の経費の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Empty,
    Uploading,
    Ready,
    ErrorShown,
    UploadFailed,
    Submitted,
}

pub struct NewBillController {
    document: Document,
    on_navigate: OnNavigate,
    store: Arc<dyn Store>,
    session: Session,
    retry_queue: RetryQueue,
    state: Mutex<DraftState>,
    /// 送信済みの更新もこの値の変化を待つ
    receipt: watch::Sender<ReceiptStatus>,
}

impl NewBillController {
    pub fn new(
        document: Document,
        on_navigate: OnNavigate,
        store: Arc<dyn Store>,
        session: Session,
        retry_queue: RetryQueue,
    ) -> Self {
        let (receipt, _) = watch::channel(ReceiptStatus::Missing);
        Self {
            document,
            on_navigate,
            store,
            session,
            retry_queue,
            state: Mutex::new(DraftState::Empty),
            receipt,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 送信済みでなければ状態を更新する
    fn set_state_unless_submitted(&self, next: DraftState) {
        let mut state = self.lock_state();
        if *state != DraftState::Submitted {
            *state = next;
        }
    }

    pub fn state(&self) -> DraftState {
        *self.lock_state()
    }

    fn uploaded(&self) -> Option<UploadedReceipt> {
        match &*self.receipt.borrow() {
            ReceiptStatus::Uploaded(receipt) => Some(receipt.clone()),
            _ => None,
        }
    }

    pub fn file_url(&self) -> Option<String> {
        self.uploaded().map(|r| r.file_url)
    }

    pub fn file_name(&self) -> Option<String> {
        self.uploaded().map(|r| r.file_name)
    }

    pub fn bill_id(&self) -> Option<String> {
        self.uploaded().map(|r| r.key)
    }

    /// 領収書ファイルの選択を処理する
    ///
    /// 拡張子がjpg/jpeg/pngの場合だけアップロードする。それ以外はエラー表示を出し、
    /// 入力済みの内容は変更しない。返り値はこの選択の結果で、送信済みの場合も
    /// アップロード結果は送信済みの更新に引き継がれる
    pub async fn handle_change_file(&self, event: &ChangeEvent) -> AppResult<DraftState> {
        let file = event
            .files
            .first()
            .cloned()
            .ok_or_else(|| AppError::validation("ファイルが選択されていません"))?;

        if !is_allowed_receipt(file.base_name()) {
            warn!("受け付けない拡張子のファイルが選択されました: {}", file.base_name());
            self.document.set_hidden(ERROR_ID, false)?;
            self.set_state_unless_submitted(DraftState::ErrorShown);
            return Ok(DraftState::ErrorShown);
        }

        self.document.set_hidden(ERROR_ID, true)?;
        self.set_state_unless_submitted(DraftState::Uploading);
        let previous = self.receipt.send_replace(ReceiptStatus::Uploading);

        let file_name = base_name_of(&event.value)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| file.base_name().to_string());

        info!("領収書をアップロードします: file_name={file_name}");
        let form = AttachmentForm {
            file,
            email: self.session.email.clone(),
        };

        match self.store.bills().create(form).await {
            Ok(upload) => {
                debug!("領収書アップロード成功: file_url={}, key={}", upload.file_url, upload.key);
                self.receipt.send_replace(ReceiptStatus::Uploaded(UploadedReceipt {
                    file_url: upload.file_url,
                    file_name,
                    key: upload.key,
                }));
                self.set_state_unless_submitted(DraftState::Ready);
                Ok(DraftState::Ready)
            }
            Err(e) => {
                error!("領収書のアップロードに失敗しました: {e}");
                // 以前にアップロードした領収書があればそれを使い続ける
                let restored = match previous {
                    ReceiptStatus::Uploaded(receipt) => ReceiptStatus::Uploaded(receipt),
                    _ => ReceiptStatus::Failed,
                };
                self.receipt.send_replace(restored);
                self.set_state_unless_submitted(DraftState::UploadFailed);
                Ok(DraftState::UploadFailed)
            }
        }
    }

    /// フォーム送信を処理する
    ///
    /// 入力値を解析して経費を組み立て、保存を再試行キューに登録してから一覧へ遷移する。
    /// 数値の解析や範囲の検証に失敗した場合だけフォームにエラーを表示して留まる。
    /// 領収書が未添付やアップロード中でも遷移し、キューが領収書を待つ
    pub fn handle_submit(&self, event: &mut SubmitEvent) -> AppResult<SubmitTicket> {
        event.prevent_default();

        let bill = match self.read_form() {
            Ok(bill) => bill,
            Err(e) => {
                warn!("入力内容の検証に失敗しました: {e}");
                self.document.set_value(FORM_ERROR_ID, &e.user_message())?;
                self.document.set_hidden(FORM_ERROR_ID, false)?;
                return Err(e);
            }
        };
        self.document.set_hidden(FORM_ERROR_ID, true)?;

        info!(
            "経費を送信します: type={}, amount={}, receipt={:?}",
            bill.expense_type,
            bill.amount,
            *self.receipt.borrow()
        );
        let ticket = self.retry_queue.enqueue(bill, self.receipt.subscribe());
        *self.lock_state() = DraftState::Submitted;

        (self.on_navigate)(Route::Bills);
        Ok(ticket)
    }

    /// フォームの入力値から送信用の経費を組み立てる
    ///
    /// 日付は入力値のまま渡す。領収書は保存時に再試行キューが設定する
    fn read_form(&self) -> AppResult<NewBill> {
        let amount = parse_integer("amount", &self.document.value(AMOUNT_ID)?)?;
        if amount < 0 {
            return Err(AppError::validation(format!(
                "金額は0以上である必要があります: {amount}"
            )));
        }

        let pct_raw = self.document.value(PCT_ID)?;
        let pct = if pct_raw.trim().is_empty() {
            DEFAULT_PCT
        } else {
            parse_integer("pct", &pct_raw)?
        };
        if !(0..=100).contains(&pct) {
            return Err(AppError::validation(format!(
                "税率は0から100の範囲である必要があります: {pct}"
            )));
        }

        let vat = parse_optional_number("vat", &self.document.value(VAT_ID)?)?;

        Ok(NewBill {
            email: self.session.email.clone(),
            expense_type: self.document.value(EXPENSE_TYPE_ID)?,
            name: self.document.value(EXPENSE_NAME_ID)?,
            amount,
            date: self.document.value(DATEPICKER_ID)?,
            vat,
            pct,
            commentary: self.document.value(COMMENTARY_ID)?,
            file_url: None,
            file_name: None,
            status: BillStatus::Pending,
        })
    }
}

/// 入力欄の値（`C:\fakepath\<name>`）から最後の`\`区切りの要素を取り出す
fn base_name_of(value: &str) -> Option<String> {
    value.rsplit('\\').next().map(str::to_string)
}
