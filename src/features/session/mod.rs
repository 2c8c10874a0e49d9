/// セッション機能モジュール
///
/// ログイン中のユーザー（種別とメールアドレス）を永続化されたキー・バリュー領域から読み出す。
/// ワークフローからは読み取り専用で、コントローラーには明示的な`Session`値として渡す。
pub mod models;
pub mod store;

pub use models::{Session, UserType, JWT_KEY, USER_KEY};
pub use store::{InMemorySessionStore, SessionStore, SqliteSessionStore};
