use crate::css::ast::{AtBlock, AtRule, Declaration, Node, StyleRule, Stylesheet};
use crate::css::text::{minify_fragment, split_top_level};
use crate::utils::error::{BuildError, Result};

/// Parses a stylesheet into [`Stylesheet`]. Unterminated comments, strings
/// and blocks are reported with the byte offset where they start.
///
/// `/*!` comments found inside a selector, a declaration block or a raw
/// at-rule body become [`Node::Comment`] siblings placed right before the
/// node that contained them.
pub fn parse_stylesheet(source: &str) -> Result<Stylesheet> {
    let mut parser = Parser::new(source);
    let nodes = parser.parse_nodes(false)?;
    Ok(Stylesheet::new(nodes))
}

enum BlockKind {
    Rules,
    Declarations,
    Raw,
}

fn block_kind(name: &str) -> BlockKind {
    let lower = name.to_ascii_lowercase();
    // -webkit-keyframes → keyframes
    let unprefixed = if lower.starts_with('-') {
        lower[1..]
            .find('-')
            .map(|i| &lower[i + 2..])
            .unwrap_or(lower.as_str())
    } else {
        lower.as_str()
    };

    match unprefixed {
        "media" | "supports" | "document" | "layer" | "container" | "scope"
        | "starting-style" => BlockKind::Rules,
        "font-face" | "page" | "viewport" | "counter-style" | "font-palette-values"
        | "property" => BlockKind::Declarations,
        _ => BlockKind::Raw,
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// 區塊內遇到的 `/*!` 註解，等目前節點解析完再放到它前面
    hoisted: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            hoisted: Vec::new(),
        }
    }

    fn error(&self, offset: usize, message: &str) -> BuildError {
        BuildError::CssParseError {
            offset,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')) {
            self.pos += 1;
        }
    }

    fn parse_nodes(&mut self, nested: bool) -> Result<Vec<Node>> {
        let open = self.pos.saturating_sub(1);
        let mut nodes = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None if nested => return Err(self.error(open, "unterminated block")),
                None => return Ok(nodes),
                Some(b'}') if nested => {
                    self.pos += 1;
                    return Ok(nodes);
                }
                Some(b'}') => return Err(self.error(self.pos, "unexpected '}'")),
                Some(b';') => self.pos += 1,
                Some(b'/') if self.starts_with("/*") => nodes.push(Node::Comment(self.parse_comment()?)),
                Some(b'<') if self.starts_with("<!--") => self.pos += 4,
                Some(b'-') if self.starts_with("-->") => self.pos += 3,
                Some(b'@') => {
                    let at = self.parse_at_rule()?;
                    self.flush_hoisted(&mut nodes);
                    nodes.push(Node::AtRule(at));
                }
                Some(_) => {
                    let rule = self.parse_style_rule()?;
                    self.flush_hoisted(&mut nodes);
                    nodes.push(Node::Rule(rule));
                }
            }
        }
    }

    fn flush_hoisted(&mut self, nodes: &mut Vec<Node>) {
        nodes.extend(self.hoisted.drain(..).map(Node::Comment));
    }

    /// 略過一般註解；授權註解留到節點結束時輸出
    fn skip_comment(&mut self) -> Result<()> {
        let body = self.parse_comment()?;
        if body.starts_with('!') {
            self.hoisted.push(body);
        }
        Ok(())
    }

    fn parse_comment(&mut self) -> Result<String> {
        let start = self.pos;
        let body_start = start + 2;
        match self.src[body_start..].find("*/") {
            Some(len) => {
                self.pos = body_start + len + 2;
                Ok(self.src[body_start..body_start + len].to_string())
            }
            None => Err(self.error(start, "unterminated comment")),
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(self.error(start, "unterminated string")),
                Some(b'\\') => self.pos = (self.pos + 2).min(self.bytes.len()),
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// 讀到頂層（不在括號或字串內）的任一停止字元為止，註解不會出現在結果中。
    /// 停止字元本身不會被消耗。
    fn read_until(&mut self, stops: &[u8]) -> Result<(String, Option<u8>)> {
        let mut out = String::new();
        let mut depth = 0usize;
        let mut segment_start = self.pos;

        while let Some(b) = self.peek() {
            match b {
                b'\\' => {
                    self.pos += 1;
                    if let Some(c) = self.src[self.pos..].chars().next() {
                        self.pos += c.len_utf8();
                    }
                }
                b'"' | b'\'' => self.skip_string(b)?,
                b'/' if self.starts_with("/*") => {
                    out.push_str(&self.src[segment_start..self.pos]);
                    self.skip_comment()?;
                    segment_start = self.pos;
                }
                b'(' | b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                _ if depth == 0 && stops.contains(&b) => {
                    out.push_str(&self.src[segment_start..self.pos]);
                    return Ok((out, Some(b)));
                }
                _ => self.pos += 1,
            }
        }

        out.push_str(&self.src[segment_start..self.pos]);
        Ok((out, None))
    }

    fn parse_style_rule(&mut self) -> Result<StyleRule> {
        let start = self.pos;
        let (prelude, stop) = self.read_until(&[b'{', b'}', b';'])?;
        if stop != Some(b'{') {
            return Err(self.error(start, "expected '{' after selector"));
        }
        self.pos += 1;

        let selectors = split_top_level(&prelude, ',')
            .into_iter()
            .map(|s| minify_fragment(s, &[',', '>', '+', '~']))
            .filter(|s| !s.is_empty())
            .collect();
        let declarations = self.parse_declarations()?;

        Ok(StyleRule {
            selectors,
            declarations,
        })
    }

    fn parse_declarations(&mut self) -> Result<Vec<Declaration>> {
        let open = self.pos.saturating_sub(1);
        let mut declarations = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.error(open, "unterminated declaration block")),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(declarations);
                }
                Some(b';') => self.pos += 1,
                Some(b'/') if self.starts_with("/*") => self.skip_comment()?,
                Some(_) => {
                    let (text, stop) = self.read_until(&[b';', b'}', b'{'])?;
                    match stop {
                        None => return Err(self.error(open, "unterminated declaration block")),
                        Some(b'{') => {
                            return Err(self.error(self.pos, "nested rules are not supported"))
                        }
                        _ => {}
                    }
                    if let Some(decl) = Declaration::parse(&text) {
                        declarations.push(decl);
                    }
                }
            }
        }
    }

    fn parse_at_rule(&mut self) -> Result<AtRule> {
        let start = self.pos;
        self.pos += 1;
        let name_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            self.pos += 1;
        }
        let name = self.src[name_start..self.pos].to_string();
        if name.is_empty() {
            return Err(self.error(start, "missing at-rule name"));
        }

        let (prelude, stop) = self.read_until(&[b'{', b';', b'}'])?;
        let prelude = prelude.trim().to_string();

        let block = match stop {
            Some(b'{') => {
                self.pos += 1;
                match block_kind(&name) {
                    BlockKind::Rules => AtBlock::Rules(self.parse_nodes(true)?),
                    BlockKind::Declarations => AtBlock::Declarations(self.parse_declarations()?),
                    BlockKind::Raw => AtBlock::Raw(self.read_raw_block()?),
                }
            }
            Some(b';') => {
                self.pos += 1;
                AtBlock::None
            }
            // `}` 留給外層區塊處理
            _ => AtBlock::None,
        };

        Ok(AtRule {
            name,
            prelude,
            block,
        })
    }

    fn read_raw_block(&mut self) -> Result<String> {
        let open = self.pos - 1;
        let mut depth = 1usize;
        let mut out = String::new();
        loop {
            let (chunk, stop) = self.read_until(&[b'{', b'}'])?;
            out.push_str(&chunk);
            match stop {
                None => return Err(self.error(open, "unterminated block")),
                Some(b'{') => {
                    depth += 1;
                    out.push('{');
                }
                _ => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(out.trim().to_string());
                    }
                    out.push('}');
                }
            }
            self.pos += 1;
        }
    }
}
