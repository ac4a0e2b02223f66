//! Total-damage extraction from a character profile page.
//!
//! The markup changes often, so this stays pattern based: find text nodes
//! carrying the keyword, try the node's own text, then its parent element's
//! text, and finally the whole document's visible text. The first value
//! found wins.

use std::ops::Deref;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::FetchError;

pub const TOTAL_DAMAGE_KEYWORD: &str = "총딜";

/// "총딜 12.3조", "총딜: 845 억", "총딜 1,234,567(상위 3%)"; the unit is optional.
static WITH_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"총딜\s*[:=]?\s*([0-9][0-9,]*(?:\.[0-9]+)?\s*[조억만]?)").unwrap()
});
/// "총딜=1,234,567,890"; the number must end at a non-word character or end of text.
static UNITLESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"총딜\s*[:=]?\s*([0-9][0-9,]*(?:\.[0-9]+)?)(?:\W|$)").unwrap()
});

type Strategy = fn(&str) -> Option<String>;

/// Node handle of the parsed tree (`ego_tree::NodeRef<Node>`).
type DomNode<'a> = <ElementRef<'a> as Deref>::Target;

/// Tried in order against every candidate text.
const STRATEGIES: &[Strategy] = &[with_unit, unitless];

const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

pub fn total_damage(html: &str) -> Result<String, FetchError> {
    let doc = Html::parse_document(html);
    let root = *doc.root_element();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if !text.contains(TOTAL_DAMAGE_KEYWORD) || !is_visible(node) {
            continue;
        }
        if let Some(found) = damage_from_text(text) {
            return Ok(found);
        }
        if let Some(parent) = node.parent() {
            if let Some(found) = damage_from_text(&visible_text(parent)) {
                return Ok(found);
            }
        }
    }

    damage_from_text(&visible_text(root)).ok_or(FetchError::DamageNotFound)
}

/// First strategy to match wins.
pub fn damage_from_text(text: &str) -> Option<String> {
    STRATEGIES.iter().find_map(|strategy| strategy(text))
}

fn with_unit(text: &str) -> Option<String> {
    capture_value(&WITH_UNIT_RE, text)
}

fn unitless(text: &str) -> Option<String> {
    capture_value(&UNITLESS_RE, text)
}

fn capture_value(re: &Regex, text: &str) -> Option<String> {
    let value = re.captures(text)?.get(1)?.as_str();
    Some(value.chars().filter(|c| !c.is_whitespace()).collect())
}

/// Stripped text fragments under `node`, joined by single spaces.
fn visible_text(node: DomNode<'_>) -> String {
    node.descendants()
        .filter_map(|n| n.value().as_text().filter(|_| is_visible(n)))
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_visible(node: DomNode<'_>) -> bool {
    !node.ancestors().any(|a| {
        a.value()
            .as_element()
            .is_some_and(|e| INVISIBLE.contains(&e.name()))
    })
}
