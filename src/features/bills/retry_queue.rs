use crate::features::bills::models::{Bill, NewBill, UploadedReceipt};
use crate::features::bills::service::Store;
use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use crate::shared::utils::get_current_paris_timestamp;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// 保持する最終失敗の上限
pub const MAX_RECORDED_FAILURES: usize = 50;

/// 更新の再試行ポリシー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 初回に加えて行う再試行の回数
    pub max_retries: u32,
    /// 最初の再試行までの待機時間（以降は倍々に延びる）
    pub base_delay: Duration,
    /// 送信時にアップロード中だった領収書を待つ上限
    pub receipt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            receipt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// 環境変数から再試行ポリシーを読み込む
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_retries = crate::get_env_var_or_default!("BILLED_UPDATE_MAX_RETRIES", "3")
            .parse()
            .unwrap_or_else(|_| {
                warn!("BILLED_UPDATE_MAX_RETRIESのパースに失敗しました。デフォルト値3回を使用します");
                defaults.max_retries
            });

        let base_delay = crate::get_env_var_or_default!("BILLED_UPDATE_BASE_DELAY_MS", "500")
            .parse()
            .map(Duration::from_millis)
            .unwrap_or_else(|_| {
                warn!("BILLED_UPDATE_BASE_DELAY_MSのパースに失敗しました。デフォルト値500msを使用します");
                defaults.base_delay
            });

        let receipt_timeout = crate::get_env_var_or_default!("BILLED_RECEIPT_TIMEOUT_MS", "60000")
            .parse()
            .map(Duration::from_millis)
            .unwrap_or_else(|_| {
                warn!("BILLED_RECEIPT_TIMEOUT_MSのパースに失敗しました。デフォルト値60秒を使用します");
                defaults.receipt_timeout
            });

        info!(
            "更新再試行ポリシー: max_retries={max_retries}, base_delay={base_delay:?}, receipt_timeout={receipt_timeout:?}"
        );

        Self {
            max_retries,
            base_delay,
            receipt_timeout,
        }
    }

    /// `attempt`回目の失敗後に待つ時間（指数バックオフ）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// 入力中の経費に添付する領収書の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    Missing,
    Uploading,
    Uploaded(UploadedReceipt),
    Failed,
}

/// 再試行しても保存できなかった更新
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpdate {
    /// 経費のキー（領収書が届かなかった場合は空）
    pub selector: String,
    pub bill: NewBill,
    pub error: String,
    pub attempts: u32,
    /// Europe/Paris時刻（RFC3339）
    pub failed_at: String,
}

struct UpdateJob {
    bill: NewBill,
    receipt: watch::Receiver<ReceiptStatus>,
    reply: oneshot::Sender<AppResult<Bill>>,
}

/// 送信された経費の保存結果を待つためのチケット
#[derive(Debug)]
pub struct SubmitTicket {
    receiver: oneshot::Receiver<AppResult<Bill>>,
}

impl SubmitTicket {
    /// 再試行を含めた最終的な保存結果
    pub async fn outcome(self) -> AppResult<Bill> {
        self.receiver.await.map_err(|_| {
            AppError::concurrency("更新キューが停止したため結果を受け取れませんでした")
        })?
    }
}

/// 経費更新をバックグラウンドで再試行するキュー
///
/// 複製したハンドルは同じワーカーと失敗一覧を共有する
#[derive(Clone)]
pub struct RetryQueue {
    sender: mpsc::UnboundedSender<UpdateJob>,
    failures: Arc<Mutex<VecDeque<FailedUpdate>>>,
}

impl RetryQueue {
    /// ワーカーを起動する（tokioランタイム内で呼び出すこと）
    pub fn spawn(store: Arc<dyn Store>, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let failures = Arc::new(Mutex::new(VecDeque::new()));

        tokio::spawn(run_worker(store, policy, receiver, failures.clone()));
        debug!("経費更新キューを起動しました");

        Self { sender, failures }
    }

    /// 更新を登録し、結果を受け取るチケットを返す
    ///
    /// 領収書のアップロードが終わっていない場合、ワーカーは完了を待ってから更新する
    pub fn enqueue(&self, bill: NewBill, receipt: watch::Receiver<ReceiptStatus>) -> SubmitTicket {
        let (reply, receiver) = oneshot::channel();
        let job = UpdateJob {
            bill,
            receipt,
            reply,
        };

        if self.sender.send(job).is_err() {
            // 送信側はここで破棄されるため、outcome()はエラーになる
            error!("更新キューが停止しているため登録できません");
        } else {
            debug!("経費更新を登録しました");
        }

        SubmitTicket { receiver }
    }

    /// 最終的に失敗した更新（古い順）
    pub fn failures(&self) -> Vec<FailedUpdate> {
        self.failures
            .lock()
            .map(|f| f.iter().cloned().collect())
            .unwrap_or_default()
    }
}

async fn run_worker(
    store: Arc<dyn Store>,
    policy: RetryPolicy,
    mut receiver: mpsc::UnboundedReceiver<UpdateJob>,
    failures: Arc<Mutex<VecDeque<FailedUpdate>>>,
) {
    while let Some(job) = receiver.recv().await {
        let UpdateJob {
            mut bill,
            receipt,
            reply,
        } = job;

        let (result, selector, attempts) =
            match wait_for_receipt(receipt, policy.receipt_timeout).await {
                Ok(receipt) => {
                    bill.attach(&receipt);
                    let (result, attempts) =
                        update_with_retry(store.as_ref(), &policy, &bill, &receipt.key).await;
                    (result, receipt.key, attempts)
                }
                Err(e) => (Err(e), String::new(), 0),
            };

        match &result {
            Ok(_) => info!("経費を保存しました: selector={selector}, attempts={attempts}"),
            Err(e) => {
                let message = format!(
                    "経費の保存に失敗しました: selector={selector}, attempts={attempts}, error={e}"
                );
                match e.severity() {
                    ErrorSeverity::Low => warn!("{message}"),
                    ErrorSeverity::Medium | ErrorSeverity::High => error!("{message}"),
                }
                record_failure(&failures, FailedUpdate {
                    selector,
                    bill,
                    error: e.user_message(),
                    attempts,
                    failed_at: get_current_paris_timestamp(),
                });
            }
        }

        if reply.send(result).is_err() {
            debug!("チケットが破棄されているため結果を通知しません");
        }
    }

    debug!("経費更新キューを終了します");
}

/// 領収書のアップロード結果を待つ
async fn wait_for_receipt(
    mut receipt: watch::Receiver<ReceiptStatus>,
    timeout: Duration,
) -> AppResult<UploadedReceipt> {
    let wait = async {
        loop {
            let status = receipt.borrow().clone();
            match status {
                ReceiptStatus::Uploaded(uploaded) => return Ok(uploaded),
                ReceiptStatus::Missing => {
                    return Err(AppError::validation("領収書が添付されていません"))
                }
                ReceiptStatus::Failed => {
                    return Err(AppError::validation("領収書のアップロードに失敗しました"))
                }
                ReceiptStatus::Uploading => {
                    debug!("領収書のアップロード完了を待ちます");
                }
            }

            if receipt.changed().await.is_err() {
                return Err(AppError::validation(
                    "領収書のアップロードが完了する前にフォームが破棄されました",
                ));
            }
        }
    };

    tokio::time::timeout(timeout, wait).await.map_err(|_| {
        AppError::validation(format!(
            "領収書のアップロードが{timeout:?}以内に完了しませんでした"
        ))
    })?
}

/// 更新を実行し、失敗した場合は指数バックオフで再試行する
async fn update_with_retry(
    store: &dyn Store,
    policy: &RetryPolicy,
    bill: &NewBill,
    selector: &str,
) -> (AppResult<Bill>, u32) {
    let service = store.bills();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match service.update(bill, selector).await {
            Ok(saved) => return (Ok(saved), attempts),
            Err(e) if attempts <= policy.max_retries => {
                let delay = policy.delay_for(attempts);
                warn!(
                    "経費の更新に失敗しました。{delay:?}後に再試行します ({attempts}/{}): {e}",
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return (Err(e), attempts),
        }
    }
}

fn record_failure(failures: &Mutex<VecDeque<FailedUpdate>>, failure: FailedUpdate) {
    let Ok(mut failures) = failures.lock() else {
        error!("失敗一覧のロック取得に失敗しました");
        return;
    };

    if failures.len() >= MAX_RECORDED_FAILURES {
        failures.pop_front();
    }
    failures.push_back(failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::bills::mock::{MockStore, MOCK_FILE_URL};
    use crate::features::bills::models::BillStatus;

    fn sample_bill() -> NewBill {
        NewBill {
            email: "a@a".to_string(),
            expense_type: "Transports".to_string(),
            name: "Vol Paris Londres".to_string(),
            amount: 348,
            date: "2004-04-04".to_string(),
            vat: Some(70.0),
            pct: 20,
            commentary: String::new(),
            file_url: None,
            file_name: None,
            status: BillStatus::Pending,
        }
    }

    fn uploaded(key: &str) -> watch::Receiver<ReceiptStatus> {
        let (_, receiver) = watch::channel(ReceiptStatus::Uploaded(UploadedReceipt {
            file_url: MOCK_FILE_URL.to_string(),
            file_name: "test.jpg".to_string(),
            key: key.to_string(),
        }));
        receiver
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            receipt_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_update_succeeds_first_time() {
        let store = Arc::new(MockStore::new());
        let queue = RetryQueue::spawn(store.clone(), fast_policy(2));

        let bill = queue
            .enqueue(sample_bill(), uploaded("1234"))
            .outcome()
            .await
            .unwrap();

        assert_eq!(bill.id, "1234");
        assert_eq!(bill.status, BillStatus::Pending);
        assert_eq!(bill.file_url.as_deref(), Some(MOCK_FILE_URL));
        assert_eq!(bill.file_name.as_deref(), Some("test.jpg"));
        assert_eq!(store.service().update_calls(), 1);
        assert!(queue.failures().is_empty());
    }

    #[tokio::test]
    async fn test_update_recovers_after_transient_failures() {
        let store = Arc::new(MockStore::new());
        store.service().fail_next_updates(2, "Erreur 500");
        let queue = RetryQueue::spawn(store.clone(), fast_policy(3));

        let bill = queue
            .enqueue(sample_bill(), uploaded("1234"))
            .outcome()
            .await
            .unwrap();

        assert_eq!(bill.name, "Vol Paris Londres");
        assert_eq!(store.service().update_calls(), 3);
        assert!(queue.failures().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_recorded() {
        let store = Arc::new(MockStore::new());
        store.service().fail_next_updates(5, "Erreur 500");
        let queue = RetryQueue::spawn(store.clone(), fast_policy(1));

        let error = queue
            .enqueue(sample_bill(), uploaded("1234"))
            .outcome()
            .await
            .unwrap_err();

        assert_eq!(error.user_message(), "Erreur 500");
        assert_eq!(store.service().update_calls(), 2);

        let failures = queue.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].selector, "1234");
        assert_eq!(failures[0].attempts, 2);
        assert_eq!(failures[0].error, "Erreur 500");
        assert!(!failures[0].failed_at.is_empty());
    }

    #[tokio::test]
    async fn test_waits_for_receipt_still_uploading() {
        let store = Arc::new(MockStore::new());
        let queue = RetryQueue::spawn(store.clone(), fast_policy(0));
        let (status, receiver) = watch::channel(ReceiptStatus::Uploading);

        let ticket = queue.enqueue(sample_bill(), receiver);
        tokio::task::yield_now().await;
        assert_eq!(store.service().update_calls(), 0);

        status.send_replace(ReceiptStatus::Uploaded(UploadedReceipt {
            file_url: MOCK_FILE_URL.to_string(),
            file_name: "myImage.png".to_string(),
            key: "1234".to_string(),
        }));

        let bill = ticket.outcome().await.unwrap();
        assert_eq!(bill.id, "1234");
        assert_eq!(bill.file_name.as_deref(), Some("myImage.png"));
    }

    #[tokio::test]
    async fn test_missing_receipt_is_recorded_without_update() {
        let store = Arc::new(MockStore::new());
        let queue = RetryQueue::spawn(store.clone(), fast_policy(2));
        let (_status, receiver) = watch::channel(ReceiptStatus::Missing);

        let error = queue.enqueue(sample_bill(), receiver).outcome().await.unwrap_err();

        assert!(matches!(error, AppError::Validation(_)));
        assert_eq!(store.service().update_calls(), 0);
        let failures = queue.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].selector, "");
        assert_eq!(failures[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_abandoned_upload_fails_after_timeout() {
        let store = Arc::new(MockStore::new());
        let policy = RetryPolicy {
            receipt_timeout: Duration::from_millis(20),
            ..fast_policy(0)
        };
        let queue = RetryQueue::spawn(store.clone(), policy);
        let (_status, receiver) = watch::channel(ReceiptStatus::Uploading);

        let error = queue.enqueue(sample_bill(), receiver).outcome().await.unwrap_err();

        assert!(matches!(error, AppError::Validation(_)));
        assert_eq!(store.service().update_calls(), 0);
        assert_eq!(queue.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_list_is_bounded() {
        let store = Arc::new(MockStore::new());
        store
            .service()
            .fail_next_updates(MAX_RECORDED_FAILURES + 5, "Erreur 500");
        let queue = RetryQueue::spawn(store, fast_policy(0));

        for i in 0..MAX_RECORDED_FAILURES + 5 {
            let _ = queue
                .enqueue(sample_bill(), uploaded(&format!("bill-{i}")))
                .outcome()
                .await;
        }

        let failures = queue.failures();
        assert_eq!(failures.len(), MAX_RECORDED_FAILURES);
        assert_eq!(failures[0].selector, "bill-5");
    }
}
