/// 経費一覧のコントローラー
///
/// ログイン中のユーザーの経費を取得して表示用に整形し、
/// 「新規作成」ボタンと領収書アイコンのクリックを処理する
use crate::features::bills::models::DisplayBill;
use crate::features::bills::service::Store;
use crate::features::dom::{Document, Element};
use crate::features::navigation::{OnNavigate, Route};
use crate::features::session::Session;
use crate::features::views::bills_ui::MODAL_ID;
use crate::shared::errors::AppResult;
use crate::shared::utils::{escape_html, format_date};
use log::{debug, error, info};
use std::sync::Arc;

pub struct BillsController {
    document: Document,
    on_navigate: OnNavigate,
    store: Option<Arc<dyn Store>>,
    session: Session,
}

impl BillsController {
    pub fn new(
        document: Document,
        on_navigate: OnNavigate,
        store: Option<Arc<dyn Store>>,
        session: Session,
    ) -> Self {
        Self {
            document,
            on_navigate,
            store,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 経費一覧を取得し、日付とステータスを表示用に整形する
    ///
    /// ストア未設定の場合は空の一覧を返す。日付の整形に失敗した経費は元の日付のまま残す。
    /// サービスのエラーはそのまま呼び出し元へ返す
    pub async fn get_bills(&self) -> AppResult<Vec<DisplayBill>> {
        let Some(store) = &self.store else {
            debug!("ストアが設定されていないため、空の一覧を返します");
            return Ok(Vec::new());
        };

        info!("経費一覧を取得します: email={}", self.session.email);
        let bills = store.bills().list().await?;

        let display_bills: Vec<DisplayBill> = bills
            .iter()
            .map(|bill| match format_date(&bill.date) {
                Ok(date) => DisplayBill::from_bill(bill, date),
                Err(e) => {
                    error!("日付の整形に失敗しました: id={}, date={}: {e}", bill.id, bill.date);
                    DisplayBill::from_bill(bill, bill.date.clone())
                }
            })
            .collect();

        info!("経費一覧取得成功: count={}", display_bills.len());
        Ok(display_bills)
    }

    /// 新規作成フォームへ遷移する
    pub fn handle_click_new_bill(&self) {
        debug!("新規経費フォームへ遷移します");
        (self.on_navigate)(Route::NewBill);
    }

    /// 領収書アイコンのURLをモーダルで表示する
    ///
    /// アイコンにURLがない場合は何もしない
    pub fn handle_click_icon_eye(&self, icon: &Element) -> AppResult<()> {
        let Some(bill_url) = icon.attribute("data-bill-url") else {
            debug!("領収書URLがないためモーダルを表示しません");
            return Ok(());
        };

        let img_width = self.document.modal_width() / 2;
        let body = format!(
            r#"<div style='text-align: center;' class="bill-proof-container"><img width={img_width} src="{}" alt="Bill" /></div>"#,
            escape_html(bill_url)
        );

        self.document.show_modal(MODAL_ID, body)?;
        debug!("領収書モーダルを表示しました: url={bill_url}");
        Ok(())
    }

    /// 描画中のページでクリックを受け付ける要素（新規作成ボタンと各アイコン）
    pub fn bind(&self) -> Vec<Element> {
        let mut elements = self.document.get_all_by_test_id("btn-new-bill");
        elements.extend(self.document.get_all_by_test_id("icon-eye"));
        elements
    }

    /// 一覧ページ上のクリックを対応する処理に振り分ける
    pub fn handle_click(&self, element: &Element) -> AppResult<()> {
        match element.test_id.as_str() {
            "btn-new-bill" => {
                self.handle_click_new_bill();
                Ok(())
            }
            "icon-eye" => self.handle_click_icon_eye(element),
            other => {
                debug!("一覧ページで処理しない要素がクリックされました: {other}");
                Ok(())
            }
        }
    }
}
