use serde::{Deserialize, Deserializer, Serialize};

/// 税率が未入力の場合の既定値（%）
pub const DEFAULT_PCT: i64 = 20;

/// 経費種別（画面の選択肢）
pub const EXPENSE_TYPES: [&str; 7] = [
    "Transports",
    "Restaurants et bars",
    "Hôtel et logement",
    "Services en ligne",
    "IT et électronique",
    "Equipement et matériel",
    "Fournitures de bureau",
];

/// 経費ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Accepted,
    Refused,
}

impl BillStatus {
    /// 一覧表示用のラベル
    pub fn label(&self) -> &'static str {
        match self {
            BillStatus::Pending => "En attente",
            BillStatus::Accepted => "Accepté",
            BillStatus::Refused => "Refused",
        }
    }
}

/// 経費データモデル（バックエンドから受け取る形）
///
/// 日付は受け取った文字列のまま保持する（不正な値も表示に回すため）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: f64,
    /// `null`や数値で届いた場合も文字列として保持する
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub date: String,
    #[serde(default, deserialize_with = "deserialize_optional_number")]
    pub vat: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_number")]
    pub pct: Option<f64>,
    #[serde(default)]
    pub commentary: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub status: BillStatus,
    #[serde(default)]
    pub comment_admin: Option<String>,
}

/// 送信時に組み立てる経費（識別子はまだ持たない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: String,
    pub name: String,
    pub amount: i64,
    pub date: String,
    pub vat: Option<f64>,
    pub pct: i64,
    pub commentary: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub status: BillStatus,
}

/// 一覧表示用の経費（保存データのコピー）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayBill {
    pub id: String,
    pub expense_type: String,
    pub name: String,
    pub amount: f64,
    /// 表示用日付（整形に失敗した場合は元の値）
    pub date: String,
    /// 並び替えに使う元の日付
    pub raw_date: String,
    /// 表示用ステータスラベル
    pub status: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
}

impl DisplayBill {
    pub fn from_bill(bill: &Bill, date: String) -> Self {
        Self {
            id: bill.id.clone(),
            expense_type: bill.expense_type.clone(),
            name: bill.name.clone(),
            amount: bill.amount,
            date,
            raw_date: bill.date.clone(),
            status: bill.status.label().to_string(),
            file_url: bill.file_url.clone(),
            file_name: bill.file_name.clone(),
        }
    }
}

/// ユーザーが選択した領収書ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptFile {
    /// ファイル名（パスを含む場合あり）
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ReceiptFile {
    pub fn new<N: Into<String>, M: Into<String>>(name: N, mime_type: M, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// パス区切り（`\` と `/`）の最後の要素
    pub fn base_name(&self) -> &str {
        self.name
            .rsplit(|c: char| c == '\\' || c == '/')
            .next()
            .unwrap_or(self.name.as_str())
    }
}

/// 添付ファイルのアップロード内容（FormData相当）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentForm {
    pub file: ReceiptFile,
    pub email: String,
}

/// アップロード結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub file_url: String,
    pub key: String,
}

/// アップロード済みの領収書（`key`は経費更新時のセレクター）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedReceipt {
    pub file_url: String,
    pub file_name: String,
    pub key: String,
}

impl NewBill {
    /// アップロード済みの領収書のURLとファイル名を設定する
    pub fn attach(&mut self, receipt: &UploadedReceipt) {
        self.file_url = Some(receipt.file_url.clone());
        self.file_name = Some(receipt.file_name.clone());
    }
}

/// 金額（未設定は0、数値として読めない場合はエラー）
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_optional_number(deserializer)?.unwrap_or(0.0))
}

/// 任意のJSON値を文字列として受け取る（`null`は空文字列）
fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

/// 文字列・数値どちらの表現も受け付ける任意数値（空文字列はNone）
fn deserialize_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(value)) => Ok(Some(value)),
        Some(NumberOrString::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
