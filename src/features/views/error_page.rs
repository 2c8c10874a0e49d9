use crate::features::dom::{Element, Rendered};
use crate::features::views::layout;
use crate::shared::utils::escape_html;

/// エラーページを描画する（メッセージはそのまま表示）
pub fn render(message: &str) -> Rendered {
    let (navbar, mut elements) = layout::vertical_layout(None);
    elements.push(Element::new("error-message").with_value(message));

    let html = format!(
        r#"<div class="layout">
{navbar}
<div class="content">
  <div class="content-header"><div class="content-title">Erreur</div></div>
  <div data-testid="error-message">{}</div>
</div>
</div>"#,
        escape_html(message)
    );

    Rendered::new(html, elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_shows_message() {
        let rendered = render("Erreur 404");
        assert!(rendered.html.contains("Erreur 404"));
        assert_eq!(
            rendered
                .elements
                .iter()
                .find(|e| e.test_id == "error-message")
                .map(|e| e.value.as_str()),
            Some("Erreur 404")
        );
    }
}
