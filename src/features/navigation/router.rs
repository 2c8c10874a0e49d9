use crate::features::bills::{
    BillsController, NewBillController, RetryPolicy, RetryQueue, Store,
};
use crate::features::dom::Document;
use crate::features::navigation::{OnNavigate, Route};
use crate::features::session::{Session, SessionStore};
use crate::features::views::{bills_ui, error_page, loading_page, new_bill_ui, BillsView};
use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};

/// ルートに対応する静的なページを描画する
///
/// 一覧は空の状態で描画する。データの読み込みは`Router::navigate`が行う
pub fn render_route(route: Route, document: &Document) {
    debug!("ページを描画します: {}", route.path());
    let rendered = match route {
        Route::Bills => bills_ui::render(BillsView::Data(&[])),
        Route::NewBill => new_bill_ui::render(),
        Route::Login | Route::Dashboard => error_page::render("Page introuvable"),
    };
    document.mount(rendered);
}

/// 表示中のページとそのコントローラー
pub enum Page {
    Bills(BillsController),
    NewBill(NewBillController),
    Other(Route),
}

impl Page {
    pub fn route(&self) -> Route {
        match self {
            Page::Bills(_) => Route::Bills,
            Page::NewBill(_) => Route::NewBill,
            Page::Other(route) => *route,
        }
    }
}

/// ページ単位のルーター
///
/// ルートごとにページを描画し、コントローラーを組み立てて返す
pub struct Router {
    document: Document,
    store: Option<Arc<dyn Store>>,
    session: Session,
    retry_queue: Option<RetryQueue>,
    history: Arc<Mutex<Vec<Route>>>,
}

impl Router {
    /// ルーターを作成する（ストアがある場合は再試行キューを起動するため、tokioランタイム内で呼び出すこと）
    pub fn new(
        document: Document,
        store: Option<Arc<dyn Store>>,
        session: Session,
        policy: RetryPolicy,
    ) -> Self {
        let retry_queue = store
            .as_ref()
            .map(|store| RetryQueue::spawn(store.clone(), policy));

        Self {
            document,
            store,
            session,
            retry_queue,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// セッションストアからログイン中のユーザーを読み込んでルーターを作成する
    pub fn from_session_store(
        document: Document,
        store: Option<Arc<dyn Store>>,
        session_store: &dyn SessionStore,
        policy: RetryPolicy,
    ) -> AppResult<Self> {
        let session = Session::from_store(session_store)?;
        info!("セッションを読み込みました: email={}", session.email);
        Ok(Self::new(document, store, session, policy))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn retry_queue(&self) -> Option<&RetryQueue> {
        self.retry_queue.as_ref()
    }

    /// コントローラーに渡す画面遷移コールバック
    pub fn on_navigate(&self) -> OnNavigate {
        let document = self.document.clone();
        let history = self.history.clone();
        Arc::new(move |route| {
            record(&history, route);
            render_route(route, &document);
        })
    }

    /// 遷移したルートの履歴（古い順）
    pub fn history(&self) -> Vec<Route> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn active_route(&self) -> Option<Route> {
        self.history().last().copied()
    }

    /// ルートへ遷移してページを描画する
    ///
    /// 一覧ページでは読み込み中を表示してから経費を取得し、
    /// 取得に失敗した場合はエラーページにメッセージを表示する
    pub async fn navigate(&self, route: Route) -> AppResult<Page> {
        info!("画面遷移: {}", route.path());
        record(&self.history, route);

        match route {
            Route::Bills => {
                self.document.mount(loading_page::render());
                let controller = BillsController::new(
                    self.document.clone(),
                    self.on_navigate(),
                    self.store.clone(),
                    self.session.clone(),
                );

                match controller.get_bills().await {
                    Ok(bills) => self.document.mount(bills_ui::render(BillsView::Data(&bills))),
                    Err(e) => {
                        match e.severity() {
                            ErrorSeverity::Low => warn!("経費一覧を表示できません: {e}"),
                            ErrorSeverity::Medium | ErrorSeverity::High => {
                                error!("経費一覧の取得に失敗しました: {e}")
                            }
                        }
                        self.document
                            .mount(bills_ui::render(BillsView::Error(&e.user_message())));
                    }
                }
                Ok(Page::Bills(controller))
            }
            Route::NewBill => {
                let (Some(store), Some(retry_queue)) = (&self.store, &self.retry_queue) else {
                    return Err(AppError::configuration(
                        "経費ストアが設定されていないため、新規経費フォームを開けません",
                    ));
                };

                self.document.mount(new_bill_ui::render());
                Ok(Page::NewBill(NewBillController::new(
                    self.document.clone(),
                    self.on_navigate(),
                    store.clone(),
                    self.session.clone(),
                    retry_queue.clone(),
                )))
            }
            Route::Login | Route::Dashboard => {
                render_route(route, &self.document);
                Ok(Page::Other(route))
            }
        }
    }
}

fn record(history: &Mutex<Vec<Route>>, route: Route) {
    match history.lock() {
        Ok(mut history) => history.push(route),
        Err(e) => error!("遷移履歴のロック取得に失敗しました: {e}"),
    }
}
