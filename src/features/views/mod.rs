/// 画面描画モジュール
///
/// 経費データからマークアップと要素の初期状態を作る純粋関数群。
/// 描画結果は`dom::Document::mount`で画面に反映する。
pub mod bills_ui;
pub mod error_page;
pub mod layout;
pub mod loading_page;
pub mod new_bill_ui;

pub use bills_ui::BillsView;
