use crate::features::bills::models::EXPENSE_TYPES;
use crate::features::dom::{Element, Rendered};
use crate::features::navigation::Route;
use crate::features::views::layout;
use crate::shared::utils::escape_html;

/// 入力欄の`data-testid`
pub const FORM_ID: &str = "form-new-bill";
pub const EXPENSE_TYPE_ID: &str = "expense-type";
pub const EXPENSE_NAME_ID: &str = "expense-name";
pub const DATEPICKER_ID: &str = "datepicker";
pub const AMOUNT_ID: &str = "amount";
pub const VAT_ID: &str = "vat";
pub const PCT_ID: &str = "pct";
pub const COMMENTARY_ID: &str = "commentary";
pub const FILE_ID: &str = "file";
pub const ERROR_ID: &str = "error";
/// 入力値の解析エラーを表示する欄
pub const FORM_ERROR_ID: &str = "form-error";

/// 新規経費フォームを描画する
///
/// エラー表示は非表示で始まり、種別は先頭の選択肢が選ばれた状態になる
pub fn render() -> Rendered {
    let (navbar, mut elements) = layout::vertical_layout(Some(Route::NewBill));

    let options: String = EXPENSE_TYPES
        .iter()
        .map(|t| format!("<option>{}</option>", escape_html(t)))
        .collect();

    elements.extend([
        Element::new(FORM_ID),
        Element::new(EXPENSE_TYPE_ID).with_value(EXPENSE_TYPES[0]),
        Element::new(EXPENSE_NAME_ID),
        Element::new(DATEPICKER_ID).with_class("blue-border"),
        Element::new(AMOUNT_ID).with_class("blue-border"),
        Element::new(VAT_ID),
        Element::new(PCT_ID),
        Element::new(COMMENTARY_ID),
        Element::new(FILE_ID),
        Element::new(ERROR_ID).hidden(),
        Element::new(FORM_ERROR_ID).hidden(),
    ]);

    let html = format!(
        r#"<div class="layout">
{navbar}
<div class="content">
  <div class="content-header"><div class="content-title">Envoyer une note de frais</div></div>
  <div class="form-newbill-container content-inner">
    <form data-testid="{FORM_ID}">
      <label for="expense-type" class="bold-label">Type de dépense</label>
      <select required class="form-control blue-border" data-testid="{EXPENSE_TYPE_ID}">{options}</select>
      <label for="expense-name" class="bold-label">Nom de la dépense</label>
      <input type="text" class="form-control blue-border" data-testid="{EXPENSE_NAME_ID}" placeholder="Vol Paris Londres" />
      <label for="datepicker" class="bold-label">Date</label>
      <input required type="date" class="form-control blue-border" data-testid="{DATEPICKER_ID}" />
      <label for="amount" class="bold-label">Montant TTC </label>
      <input required type="number" class="form-control blue-border input-icon input-icon-right" data-testid="{AMOUNT_ID}" placeholder="348"/>
      <label for="vat" class="bold-label">TVA</label>
      <input type="number" class="form-control blue-border" data-testid="{VAT_ID}" placeholder="70" />
      <input type="number" class="form-control blue-border" data-testid="{PCT_ID}" placeholder="20" />
      <label for="commentary" class="bold-label">Commentaire</label>
      <textarea class="form-control blue-border" data-testid="{COMMENTARY_ID}" rows="3"></textarea>
      <label for="file" class="bold-label">Justificatif</label>
      <input required type="file" class="form-control blue-border" data-testid="{FILE_ID}" accept=".jpg,.jpeg,.png" />
      <p data-testid="{ERROR_ID}" class="error-message" hidden>Seuls les fichiers jpg, jpeg et png sont acceptés</p>
      <p data-testid="{FORM_ERROR_ID}" class="error-message" hidden></p>
      <button type="submit" id="btn-send-bill" class="btn btn-primary">Envoyer</button>
    </form>
  </div>
</div>
</div>"#
    );

    Rendered::new(html, elements)
}
