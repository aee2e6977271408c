//! Name and team normalization used as registry keys

const GENERATIONAL_SUFFIXES: [&str; 5] = ["jr", "sr", "ii", "iii", "iv"];

/// Team abbreviations that differ between DFS sites and the league roster feed
const TEAM_ALIASES: [(&str, &str); 6] = [
    ("LAA", "ANA"),
    ("KC", "KCR"),
    ("SD", "SDP"),
    ("SF", "SFG"),
    ("TB", "TBR"),
    ("WSH", "WSN"),
];

/// Normalize a player name for matching
///
/// Lowercases, folds common accented letters to ASCII, drops punctuation that
/// sites disagree on, removes a trailing generational suffix and collapses
/// whitespace. "Vladimir Guerrero Jr." and "vladimir guerrero" map to the
/// same key.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .filter(|c| !matches!(c, '.' | '\'' | '`' | '\u{2019}'))
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() > 1 {
        if let Some(last) = tokens.last() {
            if GENERATIONAL_SUFFIXES.contains(last) {
                tokens.pop();
            }
        }
    }

    tokens.join(" ")
}

/// Normalize a team abbreviation to the roster feed's convention
pub fn normalize_team(abbr: &str) -> String {
    let upper = abbr.trim().to_uppercase();
    TEAM_ALIASES
        .iter()
        .find(|(site, _)| *site == upper)
        .map(|(_, feed)| (*feed).to_string())
        .unwrap_or(upper)
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
