use std::sync::LazyLock;

use regex::Regex;

/// Digits, optionally thousands-grouped with commas. `\d` is Unicode aware, so
/// OCR output in fullwidth digits ("４５６７８") matches too.
static FAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:,\d+)*").unwrap());

/// Take the rightmost number on the line as fame and detach its token.
///
/// The token removed is the last one (scanning from the end) whose
/// comma-stripped form contains the fame digits. When the number does not
/// fit a `u64` fame is absent and `tokens` is left as is.
pub fn take_fame(line: &str, tokens: &mut Vec<&str>) -> Option<u64> {
    let last = FAME_RE.find_iter(line).last()?;
    let digits = last.as_str().replace(',', "");
    let fame = parse_digits(&digits)?;

    if let Some(idx) = tokens
        .iter()
        .rposition(|t| t.replace(',', "").contains(&digits))
    {
        tokens.remove(idx);
    }
    Some(fame)
}

/// Decimal value of a run of ASCII or fullwidth digits; `None` on overflow or
/// on digits from any other script.
fn parse_digits(digits: &str) -> Option<u64> {
    digits.chars().try_fold(0u64, |acc, c| {
        let d = c.to_digit(10).or_else(|| fullwidth_digit(c))?;
        acc.checked_mul(10)?.checked_add(u64::from(d))
    })
}

fn fullwidth_digit(c: char) -> Option<u32> {
    ('０'..='９').contains(&c).then(|| c as u32 - '０' as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rightmost_number_wins() {
        let line = "Alpha 3 Warrior 12,345";
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(take_fame(line, &mut tokens), Some(12345));
        assert_eq!(tokens, vec!["Alpha", "3", "Warrior"]);
    }

    #[test]
    fn no_number() {
        let line = "Alpha Warrior";
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(take_fame(line, &mut tokens), None);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn glued_token_is_detached() {
        let line = "Alpha Warrior Lv45,678";
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(take_fame(line, &mut tokens), Some(45678));
        assert_eq!(tokens, vec!["Alpha", "Warrior"]);
    }

    #[test]
    fn overflow_leaves_tokens() {
        let line = "Alpha 99999999999999999999999";
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(take_fame(line, &mut tokens), None);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn fullwidth_digits() {
        let line = "Alpha Warrior ４５,６７８";
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(take_fame(line, &mut tokens), Some(45678));
        assert_eq!(tokens, vec!["Alpha", "Warrior"]);
    }

    #[test]
    fn other_script_digits_are_not_fame() {
        // Arabic-Indic digits match `\d` but have no supported value
        let line = "Alpha ١٢٣";
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(take_fame(line, &mut tokens), None);
        assert_eq!(tokens.len(), 2);
    }
}
