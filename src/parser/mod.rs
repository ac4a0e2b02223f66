pub mod fame;
pub mod normalize;

use crate::models::CharacterRecord;
use normalize::normalize_line;

/// OCR text → character records, in line order. Lines that cannot yield a
/// name are skipped; this never fails.
pub fn parse_records(raw: &str) -> Vec<CharacterRecord> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<CharacterRecord> {
    let normalized = normalize_line(line);
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    if is_numeric(tokens.first()?) {
        return None;
    }

    let fame = fame::take_fame(&normalized, &mut tokens);

    let (name, rest) = tokens.split_first()?;
    // the fame token may have been the name itself ("Alpha123")
    if is_numeric(name) {
        return None;
    }
    let job = rest.join(" ");

    Some(CharacterRecord::new(
        *name,
        (!job.is_empty()).then_some(job.as_str()),
        fame,
    ))
}

fn is_numeric(token: &str) -> bool {
    token.chars().all(char::is_numeric)
}
