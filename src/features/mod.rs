/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するモデル、コントローラー、サービスを含む自己完結型のユニットです。
/// 画面描画（views）とヘッドレスDOM（dom）は機能をまたいで共有します。
pub mod bills;
pub mod dom;
pub mod navigation;
pub mod session;
pub mod views;
