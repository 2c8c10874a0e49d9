/// ヘッドレスDOMモジュール
///
/// 画面の描画先を`data-testid`で識別される要素の表として保持する。
/// コントローラーはこの表を通してのみ画面を読み書きする。
use crate::features::bills::models::ReceiptFile;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::escape_html;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// モーダルの既定幅（px）
pub const DEFAULT_MODAL_WIDTH: u32 = 800;

/// 画面上の要素
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub test_id: String,
    pub id: Option<String>,
    pub value: String,
    pub hidden: bool,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub files: Vec<ReceiptFile>,
}

impl Element {
    pub fn new<S: Into<String>>(test_id: S) -> Self {
        Self {
            test_id: test_id.into(),
            ..Self::default()
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value<S: Into<String>>(mut self, value: S) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_class<S: Into<String>>(mut self, class: S) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// 描画結果（マークアップと要素の初期状態）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub elements: Vec<Element>,
}

impl Rendered {
    pub fn new(html: String, elements: Vec<Element>) -> Self {
        Self { html, elements }
    }
}

/// 表示中のモーダル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    pub id: String,
    pub body: String,
}

/// ファイル選択の変更イベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub target: String,
    /// 入力欄の値（ブラウザでは `C:\fakepath\<name>`）
    pub value: String,
    pub files: Vec<ReceiptFile>,
}

/// フォーム送信イベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitEvent {
    pub target: String,
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self {
            target: target.into(),
            default_prevented: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Debug)]
struct DocumentState {
    body: String,
    elements: Vec<Element>,
    modal: Option<Modal>,
    modal_width: u32,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            body: String::new(),
            elements: Vec::new(),
            modal: None,
            modal_width: DEFAULT_MODAL_WIDTH,
        }
    }
}

/// 描画先のドキュメント（複製しても同じ状態を共有する）
#[derive(Debug, Clone, Default)]
pub struct Document {
    state: Arc<Mutex<DocumentState>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DocumentState> {
        // 描画状態は常に整合しているため、パニック後も中身をそのまま使う
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 描画結果で本文と要素表を置き換える
    pub fn mount(&self, rendered: Rendered) {
        let mut state = self.state();
        state.body = rendered.html;
        state.elements = rendered.elements;
        state.modal = None;
    }

    pub fn body(&self) -> String {
        self.state().body.clone()
    }

    /// 本文に表示テキストが含まれているか
    pub fn contains_text(&self, text: &str) -> bool {
        self.state().body.contains(&escape_html(text))
    }

    pub fn has_test_id(&self, test_id: &str) -> bool {
        self.state().elements.iter().any(|e| e.test_id == test_id)
    }

    pub fn get_by_test_id(&self, test_id: &str) -> AppResult<Element> {
        self.state()
            .elements
            .iter()
            .find(|e| e.test_id == test_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("要素 data-testid={test_id}")))
    }

    pub fn get_all_by_test_id(&self, test_id: &str) -> Vec<Element> {
        self.state()
            .elements
            .iter()
            .filter(|e| e.test_id == test_id)
            .cloned()
            .collect()
    }

    pub fn get_by_id(&self, id: &str) -> AppResult<Element> {
        self.state()
            .elements
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("要素 id={id}")))
    }

    fn with_element<T>(&self, test_id: &str, f: impl FnOnce(&mut Element) -> T) -> AppResult<T> {
        let mut state = self.state();
        let element = state
            .elements
            .iter_mut()
            .find(|e| e.test_id == test_id)
            .ok_or_else(|| AppError::not_found(format!("要素 data-testid={test_id}")))?;
        Ok(f(element))
    }

    pub fn set_value(&self, test_id: &str, value: &str) -> AppResult<()> {
        self.with_element(test_id, |e| e.value = value.to_string())
    }

    pub fn value(&self, test_id: &str) -> AppResult<String> {
        self.with_element(test_id, |e| e.value.clone())
    }

    pub fn set_hidden(&self, test_id: &str, hidden: bool) -> AppResult<()> {
        self.with_element(test_id, |e| e.hidden = hidden)
    }

    pub fn is_hidden(&self, test_id: &str) -> AppResult<bool> {
        self.with_element(test_id, |e| e.hidden)
    }

    pub fn files(&self, test_id: &str) -> AppResult<Vec<ReceiptFile>> {
        self.with_element(test_id, |e| e.files.clone())
    }

    /// ファイル入力にファイルを設定し、対応する変更イベントを返す
    pub fn select_files(&self, test_id: &str, files: Vec<ReceiptFile>) -> AppResult<ChangeEvent> {
        let value = files
            .first()
            .map(|f| format!(r"C:\fakepath\{}", f.base_name()))
            .unwrap_or_default();

        self.with_element(test_id, |e| {
            e.files = files.clone();
            e.value = value.clone();
        })?;

        Ok(ChangeEvent {
            target: test_id.to_string(),
            value,
            files,
        })
    }

    pub fn set_modal_width(&self, width: u32) {
        self.state().modal_width = width;
    }

    pub fn modal_width(&self) -> u32 {
        self.state().modal_width
    }

    /// モーダルを表示する（対象のコンテナが描画されている必要がある）
    pub fn show_modal(&self, id: &str, body: String) -> AppResult<()> {
        self.get_by_id(id)?;
        self.state().modal = Some(Modal {
            id: id.to_string(),
            body,
        });
        Ok(())
    }

    pub fn modal(&self) -> Option<Modal> {
        self.state().modal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_form() -> Rendered {
        Rendered::new(
            "<form data-testid=\"form-new-bill\"><p data-testid=\"error\" hidden>Hôtel &amp; bar</p></form>"
                .to_string(),
            vec![
                Element::new("form-new-bill"),
                Element::new("amount"),
                Element::new("file"),
                Element::new("error").hidden(),
                Element::new("modal").with_id("modaleFile"),
            ],
        )
    }

    #[test]
    fn test_mount_replaces_state() {
        let document = Document::new();
        document.mount(sample_form());
        assert!(document.has_test_id("form-new-bill"));
        assert!(document.contains_text("Hôtel & bar"));

        document.mount(Rendered::default());
        assert!(!document.has_test_id("form-new-bill"));
        assert!(document.body().is_empty());
    }

    #[test]
    fn test_values_and_visibility() {
        let document = Document::new();
        document.mount(sample_form());

        document.set_value("amount", "300").unwrap();
        assert_eq!(document.value("amount").unwrap(), "300");

        assert!(document.is_hidden("error").unwrap());
        document.set_hidden("error", false).unwrap();
        assert!(!document.is_hidden("error").unwrap());

        let missing = document.set_value("inconnu", "x");
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_clones_share_state() {
        let document = Document::new();
        let other = document.clone();
        document.mount(sample_form());
        other.set_value("amount", "12").unwrap();
        assert_eq!(document.value("amount").unwrap(), "12");
    }

    #[test]
    fn test_select_files_builds_change_event() {
        let document = Document::new();
        document.mount(sample_form());

        let file = ReceiptFile::new("myImage.png", "image/png", b"myImage".to_vec());
        let event = document.select_files("file", vec![file.clone()]).unwrap();

        assert_eq!(event.value, r"C:\fakepath\myImage.png");
        assert_eq!(event.files, vec![file.clone()]);
        assert_eq!(document.files("file").unwrap(), vec![file]);
    }

    #[test]
    fn test_modal_requires_container() {
        let document = Document::new();
        assert!(document.show_modal("modaleFile", "<img>".to_string()).is_err());

        document.mount(sample_form());
        document
            .show_modal("modaleFile", "<img>".to_string())
            .unwrap();
        assert_eq!(document.modal().unwrap().id, "modaleFile");
        assert_eq!(document.modal_width(), DEFAULT_MODAL_WIDTH);
    }

    #[test]
    fn test_submit_event_prevent_default() {
        let mut event = SubmitEvent::new("form-new-bill");
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }
}
