use crate::css::ast::{AtBlock, Node, Stylesheet};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Selectors that always apply to a rendered page.
const ALWAYS_USED: &[&str] = &["html", "body"];

/// Every identifier-like token that appears in the HTML.
#[derive(Debug, Default, Clone)]
pub struct HtmlVocabulary {
    words: HashSet<String>,
    lowercase: HashSet<String>,
    classes: HashSet<String>,
    ids: HashSet<String>,
}

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[A-Za-z0-9_-]+").expect("valid regex"))
}

fn attribute_pattern() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"(?i)\b(class|id)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex")
    })
}

impl HtmlVocabulary {
    pub fn from_html(html: &str) -> Self {
        let mut vocab = Self::default();

        for m in word_pattern().find_iter(html) {
            vocab.words.insert(m.as_str().to_string());
            vocab.lowercase.insert(m.as_str().to_ascii_lowercase());
        }

        // class / id 屬性值可能含有 `:`、`/` 等字元，另外收集
        for caps in attribute_pattern().captures_iter(html) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            let target = if caps[1].eq_ignore_ascii_case("class") {
                &mut vocab.classes
            } else {
                &mut vocab.ids
            };
            for token in value.split_whitespace() {
                target.insert(token.to_string());
            }
        }

        vocab
    }

    fn has_class(&self, name: &str) -> bool {
        self.classes.contains(name) || self.words.contains(name)
    }

    fn has_id(&self, name: &str) -> bool {
        self.ids.contains(name) || self.words.contains(name)
    }

    fn has_type(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        ALWAYS_USED.contains(&lower.as_str()) || self.lowercase.contains(&lower)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SelectorParts {
    types: Vec<String>,
    classes: Vec<String>,
    ids: Vec<String>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// 讀取識別字並解開 `\:` 這類跳脫
fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c == '\\' {
            chars.next();
            if let Some(escaped) = chars.next() {
                ident.push(escaped);
            }
        } else if is_ident_char(c) {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }
    ident
}

fn skip_balanced(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, open: char, close: char) {
    let mut depth = 0usize;
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == open {
            depth += 1;
        } else if c == close {
            if depth == 0 {
                return;
            }
            depth -= 1;
        }
    }
}

/// Splits a selector into the type, class and id names it requires.
/// Attribute selectors, pseudo-classes and pseudo-elements are ignored.
fn selector_parts(selector: &str) -> SelectorParts {
    let mut parts = SelectorParts::default();
    let mut chars = selector.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
                let name = read_ident(&mut chars);
                if !name.is_empty() {
                    parts.classes.push(name);
                }
            }
            '#' => {
                chars.next();
                let name = read_ident(&mut chars);
                if !name.is_empty() {
                    parts.ids.push(name);
                }
            }
            '[' => {
                chars.next();
                skip_balanced(&mut chars, '[', ']');
            }
            ':' => {
                chars.next();
                if chars.peek() == Some(&':') {
                    chars.next();
                }
                read_ident(&mut chars);
                if chars.peek() == Some(&'(') {
                    chars.next();
                    skip_balanced(&mut chars, '(', ')');
                }
            }
            c if is_ident_char(c) || c == '\\' => {
                let name = read_ident(&mut chars);
                // `50%` 之類不是型別選擇器
                if name.chars().next().is_some_and(|c| !c.is_ascii_digit()) {
                    parts.types.push(name);
                }
            }
            _ => {
                chars.next();
            }
        }
    }

    parts
}

pub fn selector_is_used(selector: &str, vocab: &HtmlVocabulary) -> bool {
    let parts = selector_parts(selector);
    parts.types.iter().all(|t| vocab.has_type(t))
        && parts.classes.iter().all(|c| vocab.has_class(c))
        && parts.ids.iter().all(|i| vocab.has_id(i))
}

/// Removes selectors the HTML cannot match, then rules and grouping
/// at-rules left empty. Returns the number of selectors removed.
pub fn purge(sheet: &mut Stylesheet, vocab: &HtmlVocabulary) -> usize {
    purge_nodes(&mut sheet.nodes, vocab)
}

fn purge_nodes(nodes: &mut Vec<Node>, vocab: &HtmlVocabulary) -> usize {
    let mut removed = 0;
    nodes.retain_mut(|node| match node {
        Node::Rule(rule) => {
            let before = rule.selectors.len();
            rule.selectors.retain(|s| selector_is_used(s, vocab));
            removed += before - rule.selectors.len();
            !rule.selectors.is_empty()
        }
        Node::AtRule(at) => match &mut at.block {
            AtBlock::Rules(children) => {
                removed += purge_nodes(children, vocab);
                children.iter().any(|n| !matches!(n, Node::Comment(_)))
            }
            _ => true,
        },
        Node::Comment(_) => true,
    });
    removed
}
