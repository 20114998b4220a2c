//! Structured CSS post-processing for the single-file package.

pub mod ast;
pub mod data_uri;
pub mod font_face;
pub mod license;
pub mod parser;
pub mod purge;
pub mod text;

pub use ast::{AtBlock, AtRule, Declaration, Node, StyleRule, Stylesheet};
pub use font_face::{embed_woff2, strip_legacy_font_sources};
pub use license::{extract_licenses, license_block};
pub use parser::parse_stylesheet;
pub use purge::{purge, HtmlVocabulary};
