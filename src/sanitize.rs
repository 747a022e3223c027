//! Control-character sanitization

/// Strip control characters that break JSON parsing.
///
/// Removes U+0000–U+0008, U+000B, U+000C, U+000E–U+001F and U+007F while
/// keeping `\n`, `\t`, `\r` and every other character in order. Applied
/// before every parse attempt, including nested ones, because the junk can
/// reappear inside an encoded sub-document copied from another source.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !is_stripped(*c)).collect()
}

fn is_stripped(c: char) -> bool {
    matches!(
        c,
        '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}'
    )
}
