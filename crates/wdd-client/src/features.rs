use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};
use wdd_core::models::FeatureMap;
use wdd_core::traits::FeatureExtractor;

/// Elements whose text never contributes tokens.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style"];

/// Any character outside Unicode general category L (letters). Combining
/// marks and letter-numbers such as `Ⅻ` are not letters.
static NON_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\P{L}").expect("static pattern compiles"));

/// Visible-text tokenizer built on `scraper`'s HTML5 parser.
///
/// Walks the document tree depth-first, skipping `script`/`style` subtrees,
/// and counts every normalized word of every text node.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFeatureExtractor;

impl HtmlFeatureExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for HtmlFeatureExtractor {
    fn extract(&self, markup: &[u8]) -> FeatureMap {
        let source = String::from_utf8_lossy(markup);
        let document = Html::parse_document(&source);

        let mut features = FeatureMap::new();
        // Iterative depth-first walk; nesting depth is unbounded.
        let mut stack = vec![document.tree.root()];
        while let Some(node) = stack.pop() {
            match node.value() {
                Node::Element(element) if SKIPPED_ELEMENTS.contains(&element.name()) => continue,
                Node::Text(text) => add_tokens(&mut features, text),
                _ => {}
            }
            stack.extend(node.children());
        }
        features
    }
}

/// Lowercase, split on whitespace, then blank out anything that is not a
/// letter. Letters on both sides of a blanked character stay in one token
/// (`don't` becomes `don t`).
fn add_tokens(features: &mut FeatureMap, text: &str) {
    for word in text.split_whitespace() {
        let lowered = word.to_lowercase();
        let normalized = NON_LETTER.replace_all(&lowered, " ");
        let token = normalized.trim();
        if !token.is_empty() {
            *features.entry(token.to_string()).or_insert(0) += 1;
        }
    }
}
