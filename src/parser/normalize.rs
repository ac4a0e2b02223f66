use std::sync::LazyLock;

use regex::Regex;

/// Labels OCR picks up next to the fame value ("명성 45,678", "Fame 45678").
const FAME_LABELS: &[&str] = &["명성", "Fame"];

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[|｜丨/\\]").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip fame labels and separator glyphs, collapse whitespace, trim.
/// Idempotent: normalizing an already-normalized line returns it unchanged.
pub fn normalize_line(line: &str) -> String {
    let mut out = line.to_string();
    for label in FAME_LABELS {
        out = out.replace(label, " ");
    }
    let out = SEPARATOR_RE.replace_all(&out, " ");
    WS_RE.replace_all(&out, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_labels_and_separators() {
        assert_eq!(normalize_line("보리사랑 | 버서커 명성 45,678"), "보리사랑 버서커 45,678");
        assert_eq!(normalize_line("Alpha/Warrior\\Fame 123"), "Alpha Warrior 123");
        assert_eq!(normalize_line("Beta ｜ Mage 丨 9"), "Beta Mage 9");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_line("  Alpha \t  Warrior   12 "), "Alpha Warrior 12");
    }

    #[test]
    fn idempotent() {
        for raw in [
            "보리사랑 | 버서커 명성 45,678",
            "  a  /  b  ",
            "Fame",
            "",
            "Alpha Warrior 12,345",
        ] {
            let once = normalize_line(raw);
            assert_eq!(normalize_line(&once), once, "input: {:?}", raw);
        }
    }

    #[test]
    fn label_only_line_is_empty() {
        assert_eq!(normalize_line("명성 | Fame"), "");
    }
}
