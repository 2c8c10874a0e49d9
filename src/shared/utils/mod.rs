use crate::shared::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Europe::Paris;

/// 月の短縮表記（フランス語、先頭3文字を大文字始まりにしたもの）
const FRENCH_SHORT_MONTHS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

/// 日付文字列（YYYY-MM-DD形式）を解析する
pub fn parse_date(date_str: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("無効な日付です: {date_str}")))
}

/// 日付を一覧表示用の長い形式に変換する
///
/// `2004-04-04` は `4 Avr. 04` になる
pub fn format_date(date_str: &str) -> AppResult<String> {
    let date = parse_date(date_str)?;
    let month = FRENCH_SHORT_MONTHS[date.month0() as usize];
    let year = date.year().rem_euclid(100);
    Ok(format!("{} {month}. {year:02}", date.day()))
}

/// 整数として入力値を解析する
///
/// 小数は0方向に切り捨てる。数値として解釈できない場合は`AppError::Parse`
pub fn parse_integer(field: &str, raw: &str) -> AppResult<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value.trunc() as i64),
        _ => Err(AppError::parse(field, raw)),
    }
}

/// 任意入力の数値を解析する（空文字列はNone）
pub fn parse_optional_number(field: &str, raw: &str) -> AppResult<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(AppError::parse(field, raw)),
    }
}

/// HTML特殊文字をエスケープする
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 金額を文字列形式でフォーマット
pub fn format_amount(amount: f64) -> String {
    // 小数点以下が0の場合は整数として表示
    if amount.fract() == 0.0 {
        format!("{amount:.0} €")
    } else {
        format!("{amount:.2} €")
    }
}

/// 現在の日時をパリ時間で取得（RFC3339）
pub fn get_current_paris_timestamp() -> String {
    Utc::now().with_timezone(&Paris).to_rfc3339()
}
