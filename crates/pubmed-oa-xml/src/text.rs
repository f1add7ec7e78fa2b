use roxmltree::Node;

/// All text beneath `node`, nested markup included, concatenated in document order.
pub fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Only the text nodes that are direct children of `node`.
///
/// Text inside child elements (citation markers, emphasis) is left out.
pub fn direct_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Collapse runs of whitespace (including newlines and tabs) to one space and trim.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
