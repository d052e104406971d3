use html_escape::{encode_double_quoted_attribute, encode_text};

use super::node::{Child, ForegroundTree, NodeKey, PropValue};

/// Serializes the tree under the root as markup, for logging and tests.
pub fn render(tree: &ForegroundTree) -> String {
    let mut output = String::new();
    render_node(tree, tree.root(), &mut output);
    output
}

fn render_node(tree: &ForegroundTree, key: NodeKey, output: &mut String) {
    let Some(node) = tree.get(key) else {
        return;
    };

    output.push('<');
    output.push_str(&node.component);
    for (name, value) in node.props.values() {
        let text = match value {
            PropValue::Attribute(text) => text.clone(),
            PropValue::Typed(value) => value.to_string(),
        };
        push_attribute(output, name, &text);
    }
    if let Some(style) = node.props.style().filter(|style| !style.is_empty()) {
        let declarations: String = style
            .iter()
            .map(|(name, value)| format!("{name}:{value};"))
            .collect();
        push_attribute(output, "style", &declarations);
    }
    for key in node.props.listener_keys() {
        output.push(' ');
        output.push_str(key);
    }
    output.push('>');

    for child in &node.children {
        match child {
            Child::Text(text) => output.push_str(&encode_text(text)),
            Child::Node(child) => render_node(tree, *child, output),
        }
    }

    output.push_str("</");
    output.push_str(&node.component);
    output.push('>');
}

fn push_attribute(output: &mut String, name: &str, value: &str) {
    output.push(' ');
    output.push_str(name);
    output.push_str("=\"");
    output.push_str(&encode_double_quoted_attribute(value));
    output.push('"');
}
