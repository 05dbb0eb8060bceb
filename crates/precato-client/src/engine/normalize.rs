use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

const CURRENCY_SYMBOLS: [&str; 2] = ["R$", "$"];

/// Parses a Brazilian-formatted monetary string such as `R$ 1.234.567,89`.
///
/// When a comma is present it is the decimal separator and every period is a
/// thousands separator. Without a comma, periods are left alone. Anything that
/// is not a digit or period is dropped after that. Returns `None` for empty or
/// unparseable input.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let mut cleaned = raw.trim().to_string();
    for symbol in CURRENCY_SYMBOLS {
        cleaned = cleaned.replace(symbol, "");
    }
    cleaned.retain(|character| !character.is_whitespace());

    if cleaned.contains(',') {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    }
    cleaned.retain(|character| character.is_ascii_digit() || character == '.');

    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Folds a name into its comparison key: accents removed, lower-cased, and
/// only ASCII letters and digits kept.
pub fn normalize_key(raw: &str) -> String {
    strip_diacritics(raw)
        .flat_map(char::to_lowercase)
        .filter(|character| character.is_ascii_lowercase() || character.is_ascii_digit())
        .collect()
}

/// Canonical form used to match reference-table headers, which drift in case,
/// accents, and embedded line breaks between file versions.
pub fn normalize_header(raw: &str) -> String {
    let folded = strip_diacritics(raw)
        .flat_map(char::to_uppercase)
        .collect::<String>();
    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn strip_diacritics(raw: &str) -> impl Iterator<Item = char> + '_ {
    raw.nfd().filter(|character| !is_combining_mark(*character))
}
