use crate::css::ast::Stylesheet;
use crate::css::text::{find_function, function_argument, split_top_level};

/// `format()` hints dropped once only the woff2 subset ships.
pub const LEGACY_FORMATS: &[&str] = &["embedded-opentype", "woff", "truetype", "svg"];

/// Extensions treated as legacy when a source has no `format()` hint.
const LEGACY_EXTENSIONS: &[&str] = &["eot", "woff", "ttf", "svg"];

/// One comma-separated entry of a `src` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSource<'a> {
    pub text: &'a str,
    pub url: Option<&'a str>,
    pub format: Option<String>,
}

impl<'a> FontSource<'a> {
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim();
        Self {
            text,
            url: function_argument(text, "url"),
            format: function_argument(text, "format").map(|f| f.to_ascii_lowercase()),
        }
    }

    /// Lower-cased extension of the url path, query and fragment ignored.
    pub fn extension(&self) -> Option<String> {
        let url = self.url?;
        if url.starts_with("data:") {
            return None;
        }
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn is_legacy(&self) -> bool {
        match &self.format {
            Some(format) => LEGACY_FORMATS.contains(&format.as_str()),
            None => self
                .extension()
                .is_some_and(|ext| LEGACY_EXTENSIONS.contains(&ext.as_str())),
        }
    }

    pub fn is_woff2(&self) -> bool {
        match &self.format {
            Some(format) => format == "woff2",
            None => self.extension().as_deref() == Some("woff2"),
        }
    }
}

/// Drops legacy sources from every `@font-face` `src` descriptor and removes
/// descriptors left with nothing. Returns the number of sources removed.
pub fn strip_legacy_font_sources(sheet: &mut Stylesheet) -> usize {
    let mut removed = 0;
    sheet.for_each_font_face(|decls| {
        decls.retain_mut(|decl| {
            if !decl.is("src") {
                return true;
            }
            let kept: Vec<&str> = split_top_level(&decl.value, ',')
                .into_iter()
                .map(FontSource::parse)
                .filter(|source| {
                    let legacy = source.is_legacy();
                    if legacy {
                        removed += 1;
                    }
                    !legacy
                })
                .map(|source| source.text)
                .collect();

            if kept.is_empty() {
                return false;
            }
            decl.value = kept.join(",");
            true
        });
    });
    removed
}

/// Points every woff2 source at `data_uri`. Returns the number replaced.
pub fn embed_woff2(sheet: &mut Stylesheet, data_uri: &str) -> usize {
    let mut replaced = 0;
    sheet.for_each_font_face(|decls| {
        for decl in decls.iter_mut().filter(|d| d.is("src")) {
            let rewritten: Vec<String> = split_top_level(&decl.value, ',')
                .into_iter()
                .map(|entry| {
                    let source = FontSource::parse(entry);
                    match find_function(source.text, "url") {
                        Some((start, end)) if source.is_woff2() => {
                            replaced += 1;
                            format!(
                                "{}url({}){}",
                                &source.text[..start],
                                data_uri,
                                &source.text[end..]
                            )
                        }
                        _ => source.text.to_string(),
                    }
                })
                .collect();
            decl.value = rewritten.join(",");
        }
    });
    replaced
}
