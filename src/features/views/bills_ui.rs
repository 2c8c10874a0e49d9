use crate::features::bills::models::DisplayBill;
use crate::features::dom::{Element, Rendered};
use crate::features::navigation::Route;
use crate::features::views::{error_page, layout, loading_page};
use crate::shared::utils::{escape_html, format_amount, parse_date};

/// 領収書モーダルのコンテナID
pub const MODAL_ID: &str = "modaleFile";

/// 一覧ページの表示状態
#[derive(Debug, Clone, Copy)]
pub enum BillsView<'a> {
    Loading,
    Error(&'a str),
    Data(&'a [DisplayBill]),
}

/// 日付の新しい順に並べる（同じ日付は元の順序を保つ）
///
/// 解析できない日付は末尾に回す
pub fn sort_anti_chrono(bills: &[DisplayBill]) -> Vec<DisplayBill> {
    let mut sorted = bills.to_vec();
    sorted.sort_by(|a, b| {
        let a_key = parse_date(&a.raw_date).ok();
        let b_key = parse_date(&b.raw_date).ok();
        b_key.cmp(&a_key)
    });
    sorted
}

fn row(bill: &DisplayBill) -> (String, Element) {
    let mut eye = Element::new("icon-eye").with_id("eye");
    let url_attribute = match &bill.file_url {
        Some(url) => {
            eye = eye.with_attribute("data-bill-url", url.clone());
            format!(r#" data-bill-url="{}""#, escape_html(url))
        }
        None => String::new(),
    };

    let html = format!(
        r#"<tr>
  <td>{}</td>
  <td>{}</td>
  <td>{}</td>
  <td>{}</td>
  <td>{}</td>
  <td><div class="icon-actions"><div id="eye" data-testid="icon-eye"{url_attribute}></div></div></td>
</tr>"#,
        escape_html(&bill.expense_type),
        escape_html(&bill.name),
        escape_html(&bill.date),
        escape_html(&format_amount(bill.amount)),
        escape_html(&bill.status),
    );

    (html, eye)
}

fn modal() -> String {
    format!(
        r#"<div class="modal fade" id="{MODAL_ID}" tabindex="-1" role="dialog">
  <div class="modal-dialog modal-dialog-centered modal-lg" role="document">
    <div class="modal-content">
      <div class="modal-header"><h5 class="modal-title">Justificatif</h5></div>
      <div class="modal-body"></div>
    </div>
  </div>
</div>"#
    )
}

/// 一覧ページを描画する
pub fn render(view: BillsView<'_>) -> Rendered {
    let bills = match view {
        BillsView::Loading => return loading_page::render(),
        BillsView::Error(message) => return error_page::render(message),
        BillsView::Data(bills) => sort_anti_chrono(bills),
    };

    let (navbar, mut elements) = layout::vertical_layout(Some(Route::Bills));
    let mut rows = String::new();
    for bill in &bills {
        let (html, eye) = row(bill);
        rows.push_str(&html);
        elements.push(eye);
    }

    elements.push(Element::new("btn-new-bill").with_id("btn-new-bill"));
    elements.push(Element::new("tbody"));
    elements.push(Element::new("modal").with_id(MODAL_ID));

    let html = format!(
        r#"<div class="layout">
{navbar}
<div class="content">
  <div class="content-header">
    <div class="content-title">Mes notes de frais</div>
    <button type="button" data-testid="btn-new-bill" class="btn btn-primary">Nouvelle note de frais</button>
  </div>
  <div id="data-table">
    <table id="example" class="table table-striped" style="width:100%">
      <thead>
        <tr><th>Type</th><th>Nom</th><th>Date</th><th>Montant</th><th>Statut</th><th>Actions</th></tr>
      </thead>
      <tbody data-testid="tbody">
{rows}
      </tbody>
    </table>
  </div>
</div>
{modal}
</div>"#,
        modal = modal()
    );

    Rendered::new(html, elements)
}
