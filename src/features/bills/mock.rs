// テストとデモで使うモックストア

use crate::features::bills::models::{
    AttachmentForm, Bill, BillStatus, NewBill, UploadResult,
};
use crate::features::bills::service::{BillsService, Store};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// モックの`create`が返すファイルURL
pub const MOCK_FILE_URL: &str = "https://localhost:3456/images/test.jpg";

/// モックの`create`が返すキー
pub const MOCK_BILL_KEY: &str = "1234";

/// 固定の経費データ（4件、日付はすべて異なる）
pub fn fixture_bills() -> Vec<Bill> {
    vec![
        Bill {
            id: "47qAXb6fIm2zOKkLzMro".to_string(),
            email: "a@a".to_string(),
            expense_type: "Hôtel et logement".to_string(),
            name: "encore".to_string(),
            amount: 400.0,
            date: "2004-04-04".to_string(),
            vat: Some(80.0),
            pct: Some(20.0),
            commentary: Some("séminaire billed".to_string()),
            file_url: Some("https://test.storage.tld/v0/b/billable/preview-facture-free-201801-pdf-1.jpg".to_string()),
            file_name: Some("preview-facture-free-201801-pdf-1.jpg".to_string()),
            status: BillStatus::Pending,
            comment_admin: Some("ok".to_string()),
        },
        Bill {
            id: "BeKy5Mo4jkmdfPGYpTxZ".to_string(),
            email: "a@a".to_string(),
            expense_type: "Transports".to_string(),
            name: "test1".to_string(),
            amount: 100.0,
            date: "2001-01-01".to_string(),
            vat: None,
            pct: Some(20.0),
            commentary: Some("plop".to_string()),
            file_url: Some("https://test.storage.tld/v0/b/billable/1592770761.jpeg".to_string()),
            file_name: Some("1592770761.jpeg".to_string()),
            status: BillStatus::Refused,
            comment_admin: Some("en fait non".to_string()),
        },
        Bill {
            id: "UIUZtnPQvnbFnB0ozvJh".to_string(),
            email: "a@a".to_string(),
            expense_type: "Services en ligne".to_string(),
            name: "test3".to_string(),
            amount: 300.0,
            date: "2003-03-03".to_string(),
            vat: Some(60.0),
            pct: Some(20.0),
            commentary: Some(String::new()),
            file_url: Some("https://test.storage.tld/v0/b/billable/facture-client-php-exportee.png".to_string()),
            file_name: Some("facture-client-php-exportee.png".to_string()),
            status: BillStatus::Accepted,
            comment_admin: Some("bon bah d'accord".to_string()),
        },
        Bill {
            id: "qcCK3SzECmaZAGRrHjaC".to_string(),
            email: "a@a".to_string(),
            expense_type: "Restaurants et bars".to_string(),
            name: "test2".to_string(),
            amount: 200.0,
            date: "2002-02-02".to_string(),
            vat: Some(40.0),
            pct: Some(20.0),
            commentary: Some("test2".to_string()),
            file_url: Some("https://test.storage.tld/v0/b/billable/preview-facture-free-201801-pdf-1.jpg".to_string()),
            file_name: Some("preview-facture-free-201801-pdf-1.jpg".to_string()),
            status: BillStatus::Refused,
            comment_admin: Some("pas la bonne facture".to_string()),
        },
    ]
}

/// 呼び出し回数を記録し、失敗を注入できるモックサービス
#[derive(Debug)]
pub struct MockBillsService {
    bills: Mutex<Vec<Bill>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    next_list_error: Mutex<Option<String>>,
    next_create_error: Mutex<Option<String>>,
    update_errors: Mutex<Vec<String>>,
    create_gate: Mutex<Option<Arc<Notify>>>,
    uploads: Mutex<Vec<AttachmentForm>>,
    updates: Mutex<Vec<(String, NewBill)>>,
}

impl Default for MockBillsService {
    fn default() -> Self {
        Self::with_bills(fixture_bills())
    }
}

impl MockBillsService {
    pub fn with_bills(bills: Vec<Bill>) -> Self {
        Self {
            bills: Mutex::new(bills),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            next_list_error: Mutex::new(None),
            next_create_error: Mutex::new(None),
            update_errors: Mutex::new(Vec::new()),
            create_gate: Mutex::new(None),
            uploads: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// 次の`list`だけを指定メッセージで失敗させる
    pub fn fail_next_list<S: Into<String>>(&self, message: S) {
        if let Ok(mut slot) = self.next_list_error.lock() {
            *slot = Some(message.into());
        }
    }

    /// 次の`create`だけを指定メッセージで失敗させる
    pub fn fail_next_create<S: Into<String>>(&self, message: S) {
        if let Ok(mut slot) = self.next_create_error.lock() {
            *slot = Some(message.into());
        }
    }

    /// 次の`times`回の`update`を失敗させる
    pub fn fail_next_updates<S: Into<String>>(&self, times: usize, message: S) {
        let message = message.into();
        if let Ok(mut errors) = self.update_errors.lock() {
            errors.extend(std::iter::repeat(message).take(times));
        }
    }

    /// 以降の`create`を、返したNotifyが通知されるまで待たせる
    pub fn hold_creates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        if let Ok(mut slot) = self.create_gate.lock() {
            *slot = Some(gate.clone());
        }
        gate
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// `create`に渡されたフォーム
    pub fn uploads(&self) -> Vec<AttachmentForm> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    /// 成功した`update`の（selector, 内容）
    pub fn updates(&self) -> Vec<(String, NewBill)> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::concurrency(format!("モックストアのロック取得に失敗: {e}"))
}

#[async_trait]
impl BillsService for MockBillsService {
    async fn list(&self) -> AppResult<Vec<Bill>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.next_list_error.lock().map_err(lock_error)?.take() {
            return Err(AppError::external_service(message));
        }

        Ok(self.bills.lock().map_err(lock_error)?.clone())
    }

    async fn create(&self, form: AttachmentForm) -> AppResult<UploadResult> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.next_create_error.lock().map_err(lock_error)?.take() {
            return Err(AppError::external_service(message));
        }

        let gate = self.create_gate.lock().map_err(lock_error)?.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.uploads.lock().map_err(lock_error)?.push(form);
        Ok(UploadResult {
            file_url: MOCK_FILE_URL.to_string(),
            key: MOCK_BILL_KEY.to_string(),
        })
    }

    async fn update(&self, bill: &NewBill, selector: &str) -> AppResult<Bill> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        {
            let mut errors = self.update_errors.lock().map_err(lock_error)?;
            if !errors.is_empty() {
                return Err(AppError::external_service(errors.remove(0)));
            }
        }

        self.updates
            .lock()
            .map_err(lock_error)?
            .push((selector.to_string(), bill.clone()));

        let updated = Bill {
            id: selector.to_string(),
            email: bill.email.clone(),
            expense_type: bill.expense_type.clone(),
            name: bill.name.clone(),
            amount: bill.amount as f64,
            date: bill.date.clone(),
            vat: bill.vat,
            pct: Some(bill.pct as f64),
            commentary: Some(bill.commentary.clone()),
            file_url: bill.file_url.clone(),
            file_name: bill.file_name.clone(),
            status: bill.status,
            comment_admin: None,
        };

        let mut bills = self.bills.lock().map_err(lock_error)?;
        match bills.iter_mut().find(|b| b.id == selector) {
            Some(existing) => *existing = updated.clone(),
            None => bills.push(updated.clone()),
        }

        Ok(updated)
    }
}

/// モックサービスを返すストア
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    service: Arc<MockBillsService>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bills(bills: Vec<Bill>) -> Self {
        Self {
            service: Arc::new(MockBillsService::with_bills(bills)),
        }
    }

    /// 呼び出し回数の確認や失敗の注入に使う
    pub fn service(&self) -> &MockBillsService {
        &self.service
    }
}

impl Store for MockStore {
    fn bills(&self) -> Arc<dyn BillsService> {
        self.service.clone()
    }
}
