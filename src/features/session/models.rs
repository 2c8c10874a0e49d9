use crate::features::session::store::SessionStore;
use crate::shared::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// セッションストア上でユーザー情報を保持するキー
pub const USER_KEY: &str = "user";

/// セッションストア上でJWTを保持するキー
pub const JWT_KEY: &str = "jwt";

/// ユーザー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    #[serde(alias = "employee")]
    Employee,
    #[serde(alias = "admin")]
    Admin,
}

/// ログイン中のユーザーを表すセッション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "type")]
    pub user_type: UserType,
    #[serde(default)]
    pub email: String,
}

impl Session {
    pub fn new<S: Into<String>>(user_type: UserType, email: S) -> Self {
        Self {
            user_type,
            email: email.into(),
        }
    }

    pub fn employee<S: Into<String>>(email: S) -> Self {
        Self::new(UserType::Employee, email)
    }

    /// セッションストアから現在のユーザーを読み込む
    ///
    /// コントローラーはこの値を構築時に受け取り、ストアを直接参照しない
    pub fn from_store(store: &dyn SessionStore) -> AppResult<Self> {
        let raw = store
            .get_item(USER_KEY)?
            .ok_or_else(|| AppError::session("ユーザー情報が保存されていません"))?;

        let session: Session = serde_json::from_str(&raw)
            .map_err(|e| AppError::session(format!("ユーザー情報の解析に失敗: {e}")))?;

        log::debug!(
            "セッションを読み込みました: type={:?}, email={}",
            session.user_type,
            session.email
        );
        Ok(session)
    }

    /// セッションストアに現在のユーザーを書き込む
    pub fn save_to(&self, store: &dyn SessionStore) -> AppResult<()> {
        store.set_item(USER_KEY, &serde_json::to_string(self)?)
    }

    pub fn is_employee(&self) -> bool {
        self.user_type == UserType::Employee
    }
}
