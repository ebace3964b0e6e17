//! Variable name conversion

/// Convert a UPnP variable name to lower_snake_case.
///
/// Acronyms stay together and are split from the following word:
/// `CurrentURIMetaData` becomes `current_uri_meta_data`.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();

    // Split before each capitalised word that follows another character.
    let mut words = Vec::with_capacity(chars.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let starts_word = chars.get(i + 1).is_some_and(char::is_ascii_uppercase)
            && chars.get(i + 2).is_some_and(char::is_ascii_lowercase);
        if starts_word {
            words.push(chars[i]);
            words.push('_');
            words.push(chars[i + 1]);
            let mut j = i + 2;
            while j < chars.len() && chars[j].is_ascii_lowercase() {
                words.push(chars[j]);
                j += 1;
            }
            i = j;
        } else {
            words.push(chars[i]);
            i += 1;
        }
    }

    // Split any remaining lower-or-digit to upper boundary.
    let mut out = String::with_capacity(words.len() + 4);
    let mut i = 0;
    while i < words.len() {
        let c = words[i];
        let boundary = (c.is_ascii_lowercase() || c.is_ascii_digit())
            && words.get(i + 1).is_some_and(char::is_ascii_uppercase);
        if boundary {
            out.push(c);
            out.push('_');
            out.push(words[i + 1]);
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }

    out.to_lowercase()
}
