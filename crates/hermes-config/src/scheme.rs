//! URI scheme syntax shared by the host and the helper.

/// Filters `input` down to a legal scheme, as defined by RFC 3986.
///
/// Every character is lowercased, characters outside `[a-z0-9.+-]` are
/// dropped, and leading non-letters are stripped. Returns `None` when
/// nothing usable remains.
#[must_use]
pub fn sanitize_scheme(input: &str) -> Option<String> {
    let filtered: String = input
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|character| is_scheme_char(*character))
        .collect();
    let trimmed = filtered.trim_start_matches(|character: char| !character.is_ascii_lowercase());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Whether `text` is already a lowercase scheme that [`sanitize_scheme`]
/// would return unchanged.
#[must_use]
pub fn is_valid_scheme(text: &str) -> bool {
    let mut characters = text.chars();
    characters
        .next()
        .is_some_and(|first| first.is_ascii_lowercase())
        && characters.all(is_scheme_char)
}

fn is_scheme_char(character: char) -> bool {
    character.is_ascii_lowercase()
        || character.is_ascii_digit()
        || matches!(character, '.' | '-' | '+')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("hue4", Some("hue4"))]
    #[case("HUE4", Some("hue4"))]
    #[case("My Game", Some("mygame"))]
    #[case("++UE5+Release-5.3", Some("ue5+release-5.3"))]
    #[case("42-answer", Some("answer"))]
    #[case("..-+9x", Some("x"))]
    #[case("snake_case", Some("snakecase"))]
    #[case("Ünïcode", Some("ncode"))]
    #[case("1234", None)]
    #[case("", None)]
    #[case("!!!", None)]
    fn sanitizes_input(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(sanitize_scheme(input).as_deref(), expected);
    }

    #[rstest]
    #[case("hue4")]
    #[case("  Spaced Out  ")]
    #[case("++Depot+Stream+Main")]
    #[case("9lives.CAT")]
    #[case("---")]
    #[case("ÀÉÎõü-x")]
    #[case("a")]
    fn sanitize_is_idempotent_and_valid(#[case] input: &str) {
        if let Some(once) = sanitize_scheme(input) {
            assert!(is_valid_scheme(&once), "invalid output {once}");
            assert_eq!(sanitize_scheme(&once), Some(once));
        }
    }

    #[rstest]
    #[case("hue4", true)]
    #[case("a+b.c", true)]
    #[case("Hue4", false)]
    #[case("4hue", false)]
    #[case("hue 4", false)]
    #[case("", false)]
    fn validates_lowercase_schemes(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_valid_scheme(text), expected);
    }
}
