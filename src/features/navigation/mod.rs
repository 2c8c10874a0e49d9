/// ナビゲーション機能モジュール
///
/// ルート定義、ナビゲーションコールバック、ページ単位のルーター
pub mod router;

pub use router::{render_route, Page, Router};

use std::sync::Arc;

/// 画面のルート
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Bills,
    NewBill,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Bills => "#employee/bills",
            Route::NewBill => "#employee/bill/new",
            Route::Dashboard => "#admin/dashboard",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        [Route::Login, Route::Bills, Route::NewBill, Route::Dashboard]
            .into_iter()
            .find(|route| route.path() == path)
    }
}

/// ホストアプリケーションが提供する画面遷移コールバック
pub type OnNavigate = Arc<dyn Fn(Route) + Send + Sync>;
