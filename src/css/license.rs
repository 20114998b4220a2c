use crate::css::ast::{AtBlock, Node, Stylesheet};

/// Removes every `/*! ... */` comment from the sheet and returns their
/// bodies, in document order, without the `/*!` and `*/` markers.
pub fn extract_licenses(sheet: &mut Stylesheet) -> Vec<String> {
    let mut licenses = Vec::new();
    take_licenses(&mut sheet.nodes, &mut licenses);
    licenses
}

fn take_licenses(nodes: &mut Vec<Node>, licenses: &mut Vec<String>) {
    nodes.retain_mut(|node| match node {
        Node::Comment(body) if body.starts_with('!') => {
            licenses.push(body[1..].to_string());
            false
        }
        Node::AtRule(at) => {
            if let AtBlock::Rules(children) = &mut at.block {
                take_licenses(children, licenses);
            }
            true
        }
        _ => true,
    });
}

/// 將授權文字組成要放進 HTML 的區塊：每段前後各一個換行
pub fn license_block(licenses: &[String]) -> String {
    licenses
        .iter()
        .map(|body| format!("\n{}\n", body))
        .collect()
}
