//! Minimal CSS syntax tree: just enough structure to purge selectors and
//! rewrite `@font-face` sources without touching anything else.

use crate::css::text::minify_fragment;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Comment body without the `/*` `*/` markers
    Comment(String),
    Rule(StyleRule),
    AtRule(AtRule),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    /// `prop: value` → Declaration；沒有冒號或屬性名為空則忽略
    pub fn parse(text: &str) -> Option<Self> {
        let colon = text.find(':')?;
        let property = text[..colon].trim();
        if property.is_empty() {
            return None;
        }
        Some(Self::new(property, text[colon + 1..].trim()))
    }

    pub fn is(&self, property: &str) -> bool {
        self.property.eq_ignore_ascii_case(property)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    /// Name without the leading `@`
    pub name: String,
    pub prelude: String,
    pub block: AtBlock,
}

impl AtRule {
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtBlock {
    /// Statement at-rule such as `@charset "utf-8";`
    None,
    /// Grouping rules (`@media`, `@supports`)
    Rules(Vec<Node>),
    /// Descriptor blocks (`@font-face`, `@page`)
    Declarations(Vec<Declaration>),
    /// Kept verbatim (`@keyframes` and anything unknown)
    Raw(String),
}

impl Stylesheet {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Number of style rules, including those nested in grouping at-rules.
    pub fn rule_count(&self) -> usize {
        count_rules(&self.nodes)
    }

    /// 依序走訪所有 `@font-face` 區塊（含巢狀於 @media 內者）
    pub fn for_each_font_face<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Vec<Declaration>),
    {
        visit_font_faces(&mut self.nodes, &mut f);
    }

    /// Single-line serialisation. `/*! */` comments survive, other comments are dropped.
    pub fn to_minified_string(&self) -> String {
        let mut out = String::new();
        write_nodes(&self.nodes, &mut out);
        out
    }
}

fn count_rules(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Rule(_) => 1,
            Node::AtRule(AtRule {
                block: AtBlock::Rules(children),
                ..
            }) => count_rules(children),
            _ => 0,
        })
        .sum()
}

fn visit_font_faces<F>(nodes: &mut [Node], f: &mut F)
where
    F: FnMut(&mut Vec<Declaration>),
{
    for node in nodes {
        if let Node::AtRule(at) = node {
            let is_font_face = at.is("font-face");
            match &mut at.block {
                AtBlock::Declarations(decls) if is_font_face => f(decls),
                AtBlock::Rules(children) => visit_font_faces(children, f),
                _ => {}
            }
        }
    }
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Comment(body) => {
                if body.starts_with('!') {
                    out.push_str("/*");
                    out.push_str(body);
                    out.push_str("*/");
                }
            }
            Node::Rule(rule) => {
                out.push_str(&rule.selectors.join(","));
                out.push('{');
                write_declarations(&rule.declarations, out);
                out.push('}');
            }
            Node::AtRule(at) => {
                out.push('@');
                out.push_str(&at.name);
                let prelude = minify_fragment(&at.prelude, &[',']);
                if !prelude.is_empty() {
                    // `@media(` 在舊瀏覽器不合法，保留空白
                    out.push(' ');
                    out.push_str(&prelude);
                }
                match &at.block {
                    AtBlock::None => out.push(';'),
                    AtBlock::Rules(children) => {
                        out.push('{');
                        write_nodes(children, out);
                        out.push('}');
                    }
                    AtBlock::Declarations(decls) => {
                        out.push('{');
                        write_declarations(decls, out);
                        out.push('}');
                    }
                    AtBlock::Raw(raw) => {
                        out.push('{');
                        out.push_str(&minify_fragment(raw, &['{', '}', ';', ':', ',']));
                        out.push('}');
                    }
                }
            }
        }
    }
}

fn write_declarations(decls: &[Declaration], out: &mut String) {
    let parts: Vec<String> = decls
        .iter()
        .map(|d| format!("{}:{}", d.property, minify_fragment(&d.value, &[','])))
        .collect();
    out.push_str(&parts.join(";"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minified_output() {
        let sheet = Stylesheet::new(vec![
            Node::Comment("! keep me ".to_string()),
            Node::Comment(" drop me ".to_string()),
            Node::Rule(StyleRule {
                selectors: vec!["a".to_string(), ".b>.c".to_string()],
                declarations: vec![
                    Declaration::new("color", "red"),
                    Declaration::new("font-family", "\"Open Sans\", sans-serif"),
                ],
            }),
            Node::AtRule(AtRule {
                name: "media".to_string(),
                prelude: "screen  and (max-width: 600px)".to_string(),
                block: AtBlock::Rules(vec![Node::Rule(StyleRule {
                    selectors: vec!["a".to_string()],
                    declarations: vec![Declaration::new("margin", "0 auto")],
                })]),
            }),
            Node::AtRule(AtRule {
                name: "charset".to_string(),
                prelude: "\"UTF-8\"".to_string(),
                block: AtBlock::None,
            }),
        ]);

        assert_eq!(
            sheet.to_minified_string(),
            "/*! keep me */a,.b>.c{color:red;font-family:\"Open Sans\",sans-serif}\
             @media screen and (max-width: 600px){a{margin:0 auto}}@charset \"UTF-8\";"
        );
        assert_eq!(sheet.rule_count(), 2);
    }

    #[test]
    fn test_declaration_parse() {
        let decl = Declaration::parse(" background : url(a.png) no-repeat ").unwrap();
        assert_eq!(decl.property, "background");
        assert_eq!(decl.value, "url(a.png) no-repeat");
        assert!(Declaration::parse("no-colon-here").is_none());
        assert!(Declaration::parse(": red").is_none());
    }
}
