//! Side-panel text heuristics.
//!
//! Servers decorate their side panel with stylized alphabets, so every row is
//! folded to plain lowercase ASCII before matching. The label picker then
//! looks for the row right after the "season" banner that does not look like
//! a statistic.

use std::sync::OnceLock;

use confusables::Confusable;
use fleetwatch_proto::FormattedStringExt;
use regex::Regex;

/// Rows scanned after the season banner before falling back.
const SEASON_WINDOW: usize = 6;

fn season_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bseason\b").ok()).as_ref()
}

fn banned_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(season|server|balance|experience|xp|k/d|fly\s*time|power|online|shield|factions?|members?|claim(?:ed)?|money|coins|vote|store|discord|website|hub)\b|mc-?complex|\.com",
        )
        .ok()
    })
    .as_ref()
}

fn bracket_tag_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]+\]").ok()).as_ref()
}

fn small_caps(c: char) -> Option<char> {
    Some(match c {
        'ᴀ' => 'a',
        'ʙ' => 'b',
        'ᴄ' => 'c',
        'ᴅ' => 'd',
        'ᴇ' => 'e',
        'ғ' | 'ꜰ' => 'f',
        'ɢ' => 'g',
        'ʜ' => 'h',
        'ɪ' => 'i',
        'ᴊ' => 'j',
        'ᴋ' => 'k',
        'ʟ' => 'l',
        'ᴍ' => 'm',
        'ɴ' => 'n',
        'ᴏ' => 'o',
        'ᴘ' => 'p',
        'ǫ' => 'q',
        'ʀ' => 'r',
        'ꜱ' => 's',
        'ᴛ' => 't',
        'ᴜ' => 'u',
        'ᴠ' => 'v',
        'ᴡ' => 'w',
        'ʏ' => 'y',
        'ᴢ' => 'z',
        _ => return None,
    })
}

fn fullwidth(c: char) -> Option<char> {
    match c as u32 {
        0xFF01..=0xFF5E => char::from_u32(c as u32 - 0xFEE0),
        _ => None,
    }
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}

fn fold_latin(c: char) -> Option<char> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' | 'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'c',
        'ď' | 'Ď' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' | 'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'g',
        'ĥ' | 'Ĥ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'i',
        'ĵ' | 'Ĵ' => 'j',
        'ķ' | 'Ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ł' | 'Ĺ' | 'Ļ' | 'Ľ' | 'Ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' | 'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' | 'Ŕ' | 'Ŗ' | 'Ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' | 'Ś' | 'Ŝ' | 'Ş' | 'Š' => 's',
        'ţ' | 'ť' | 'Ţ' | 'Ť' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'u',
        'ŵ' | 'Ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' | 'Ý' | 'Ÿ' | 'Ŷ' => 'y',
        'ź' | 'ż' | 'ž' | 'Ź' | 'Ż' | 'Ž' => 'z',
        _ => return None,
    })
}

/// Fold a row to lowercase plain ASCII where possible.
///
/// Strips formatting codes and combining marks, folds Latin diacritics,
/// small-caps and fullwidth letters, and maps remaining non-ASCII homoglyphs
/// to their ASCII prototypes. ASCII input only gets lowercased.
pub fn normalize_for_match(raw: &str) -> String {
    let stripped = raw.strip_formatting();
    let mut out = String::with_capacity(stripped.len());

    for c in stripped.chars() {
        if c.is_ascii() {
            out.push(c.to_ascii_lowercase());
        } else if is_combining_mark(c) {
            continue;
        } else if let Some(folded) = small_caps(c).or_else(|| fullwidth(c)).or_else(|| fold_latin(c)) {
            out.push(folded.to_ascii_lowercase());
        } else {
            let mut buf = [0u8; 4];
            let single: &str = c.encode_utf8(&mut buf);
            for r in single.detect_replace_confusable().chars() {
                out.extend(r.to_lowercase());
            }
        }
    }

    out
}

fn is_candidate(raw: &str, norm: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    if banned_re().is_some_and(|re| re.is_match(norm)) {
        return false;
    }
    // [Member] or (Rank) prefixes
    if trimmed.starts_with(['[', '(']) {
        return false;
    }
    // stat bullet lines
    if trimmed.starts_with(['•', '▪', '-']) {
        return false;
    }
    // tags such as "hallo [#371]"
    if bracket_tag_re().is_some_and(|re| re.is_match(raw)) {
        return false;
    }
    // "Key: Value"
    !raw.contains(':')
}

/// Pick the most likely world label from ordered side-panel rows.
///
/// Prefers the first candidate within a few rows after the "season" banner
/// and falls back to the first candidate anywhere.
pub fn pick_world_label<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }

    let pairs: Vec<(&str, String)> = lines
        .iter()
        .map(|l| (l.as_ref(), normalize_for_match(l.as_ref())))
        .collect();

    let season = pairs
        .iter()
        .position(|(_, norm)| season_re().is_some_and(|re| re.is_match(norm)));
    let start = season.map_or(0, |i| (i + 1).min(pairs.len() - 1));
    let end = pairs.len().min(start + SEASON_WINDOW);

    pairs[start..end]
        .iter()
        .find(|(raw, norm)| is_candidate(raw, norm))
        .or_else(|| pairs.iter().find(|(raw, norm)| is_candidate(raw, norm)))
        .map(|(raw, _)| raw.trim().to_string())
}
