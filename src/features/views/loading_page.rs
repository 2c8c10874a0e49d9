use crate::features::dom::{Element, Rendered};
use crate::features::views::layout;

pub fn render() -> Rendered {
    let (navbar, mut elements) = layout::vertical_layout(None);
    elements.push(Element::new("loading").with_id("loading"));

    let html = format!(
        r#"<div class="layout">
{navbar}
<div class="content"><div id="loading" data-testid="loading">Loading...</div></div>
</div>"#
    );

    Rendered::new(html, elements)
}
