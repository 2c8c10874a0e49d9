use crate::features::dom::Element;
use crate::features::navigation::Route;

/// 縦メニュー（アクティブなページのアイコンを強調する）
pub fn vertical_layout(active: Option<Route>) -> (String, Vec<Element>) {
    let window_class = icon_class(active == Some(Route::Bills));
    let mail_class = icon_class(active == Some(Route::NewBill));

    let html = format!(
        r#"<div class="vertical-navbar">
  <div class="layout-title"><span>Billed</span></div>
  <div id="layout-icon1" data-testid="icon-window" class="{window_class}"></div>
  <div id="layout-icon2" data-testid="icon-mail" class="{mail_class}"></div>
  <div id="layout-disconnect"></div>
</div>"#
    );

    let mut window = Element::new("icon-window").with_id("layout-icon1");
    let mut mail = Element::new("icon-mail").with_id("layout-icon2");
    if active == Some(Route::Bills) {
        window = window.with_class("active-icon");
    }
    if active == Some(Route::NewBill) {
        mail = mail.with_class("active-icon");
    }

    (html, vec![window, mail])
}

fn icon_class(active: bool) -> &'static str {
    if active {
        "active-icon"
    } else {
        ""
    }
}
