// Pocketkeys Grapheme Segmentation
// Emoji-aware character boundaries used by the composer and emoji tooling

use unicode_segmentation::UnicodeSegmentation;

/// Fitzpatrick skin tone modifiers, lightest to darkest
pub const FITZPATRICK_MODIFIERS: [char; 5] = [
    '\u{1F3FB}',
    '\u{1F3FC}',
    '\u{1F3FD}',
    '\u{1F3FE}',
    '\u{1F3FF}',
];

// "People holding hands" takes its tone modifier on the leading person only
const HANDS_EMOJI: char = '\u{1F91D}';

/// Capitalization pattern of a word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capitalization {
    AllUpper,
    FirstUpper,
    None,
}

/// Zero width joiner
pub const ZWJ: char = '\u{200D}';

/// Split text into user-perceived characters.
///
/// Extended grapheme clusters, with a cluster ending in ZWJ always joined
/// to the next one. ZWJ sequences, skin tones, variation selectors, flags
/// and subdivision flags stay whole. Concatenating the returned slices
/// gives back `text`.
pub fn split_into_clusters(text: &str) -> Vec<&str> {
    let mut clusters = Vec::new();
    let mut start = 0;
    for (offset, _) in text.grapheme_indices(true) {
        if offset > start && !text[..offset].ends_with(ZWJ) {
            clusters.push(&text[start..offset]);
            start = offset;
        }
    }
    if start < text.len() {
        clusters.push(&text[start..]);
    }
    clusters
}

/// UTF-8 byte length of the last user-perceived character of `text`.
///
/// Returns 0 for empty text.
pub fn last_cluster_len(text: &str) -> usize {
    let start = text
        .grapheme_indices(true)
        .rev()
        .map(|(offset, _)| offset)
        .find(|&offset| offset == 0 || !text[..offset].ends_with(ZWJ))
        .unwrap_or(0);
    text.len() - start
}

/// Byte index where the trailing word of `text` starts.
///
/// A word is a run of letters, digits and characters from `exclusions`.
/// Returns 0 when the whole text is one word.
pub fn word_start_index(text: &str, exclusions: &str) -> usize {
    text.char_indices()
        .rev()
        .find(|&(_, c)| !c.is_alphanumeric() && !exclusions.contains(c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0)
}

/// Punctuation that attaches to the preceding word
pub fn is_punctuation(c: char) -> bool {
    matches!(c, ',' | '.' | '?' | '!')
}

/// Unicode space separator (Zs, Zl, Zp); tabs and newlines do not count
pub fn is_space_separator(c: char) -> bool {
    matches!(
        c,
        ' ' | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// True if `text` ends with a letter or digit followed by a single space
pub fn is_letter_or_digit_and_space(text: &str) -> bool {
    let mut chars = text.chars().rev();
    match (chars.next(), chars.next()) {
        (Some(space), Some(prev)) => is_space_separator(space) && prev.is_alphanumeric(),
        _ => false,
    }
}

/// Classify the capitalization of `text`
pub fn capitalization_type(text: &str) -> Capitalization {
    match text.chars().next() {
        Some(first) if first.is_uppercase() => {
            if text.chars().all(char::is_uppercase) {
                Capitalization::AllUpper
            } else {
                Capitalization::FirstUpper
            }
        }
        _ => Capitalization::None,
    }
}

/// Uppercase the first character, `None` for empty text
pub fn capitalize_first_letter(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let first = chars.next()?;
    let mut result: String = first.to_uppercase().collect();
    result.push_str(chars.as_str());
    Some(result)
}

/// Give `word` the capitalization pattern of `typed`
pub fn match_capitalization(word: &str, typed: &str) -> String {
    match capitalization_type(typed) {
        Capitalization::AllUpper => word.to_uppercase(),
        Capitalization::FirstUpper => {
            capitalize_first_letter(word).unwrap_or_default()
        }
        Capitalization::None => word.to_string(),
    }
}

/// All skin tone variants of an emoji string.
///
/// The first element is the text with every tone modifier removed,
/// followed by one variant per Fitzpatrick modifier. `aware` lists the
/// emoji that accept a modifier. Returns an empty list when nothing in
/// `text` can take a skin tone.
pub fn fitzpatrick_variants(text: &str, aware: &[char]) -> Vec<String> {
    let clean: Vec<char> = text
        .chars()
        .filter(|c| !FITZPATRICK_MODIFIERS.contains(c))
        .collect();

    let mut variants = vec![String::new(); FITZPATRICK_MODIFIERS.len()];
    let mut inserted = false;

    for (i, &c) in clean.iter().enumerate() {
        let takes_tone = aware.contains(&c) && !(c == HANDS_EMOJI && i > 0);
        for (variant, &tone) in variants.iter_mut().zip(FITZPATRICK_MODIFIERS.iter()) {
            variant.push(c);
            if takes_tone {
                variant.push(tone);
            }
        }
        inserted |= takes_tone;
    }

    if !inserted {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(variants.len() + 1);
    result.push(clean.into_iter().collect());
    result.extend(variants);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNNING_WOMAN: &str = "\u{1F3C3}\u{1F3FB}\u{200D}\u{2640}";
    const FAMILY: &str = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
    const ENGLAND: &str =
        "\u{1F3F4}\u{E0067}\u{E0062}\u{E0065}\u{E006E}\u{E0067}\u{E007F}";
    const FLAG_VG: &str = "\u{1F1FB}\u{1F1EC}";

    #[test]
    fn test_split_plain_text() {
        assert_eq!(split_into_clusters("abc"), vec!["a", "b", "c"]);
        assert!(split_into_clusters("").is_empty());
    }

    #[test]
    fn test_split_zwj_sequence_is_one_cluster() {
        assert_eq!(split_into_clusters(FAMILY), vec![FAMILY]);
        let text = format!("a{}b", RUNNING_WOMAN);
        assert_eq!(split_into_clusters(&text), vec!["a", RUNNING_WOMAN, "b"]);
    }

    #[test]
    fn test_split_flags() {
        let text = format!("{}{}{}", ENGLAND, FLAG_VG, FLAG_VG);
        assert_eq!(
            split_into_clusters(&text),
            vec![ENGLAND, FLAG_VG, FLAG_VG]
        );
    }

    #[test]
    fn test_split_mixed_round_trip() {
        let text = format!(
            "{}{}\u{1F441}\u{200D}\u{1F5E8}{}x\u{2764}\u{FE0F}",
            ENGLAND, RUNNING_WOMAN, FLAG_VG
        );
        assert_eq!(split_into_clusters(&text).concat(), text);
    }

    #[test]
    fn test_zwj_joins_any_neighbours() {
        assert_eq!(split_into_clusters("a\u{200D}b"), vec!["a\u{200D}b"]);
        assert_eq!(split_into_clusters("xa\u{200D}b"), vec!["x", "a\u{200D}b"]);
        assert_eq!(last_cluster_len("a\u{200D}b"), "a\u{200D}b".len());
        assert_eq!(last_cluster_len("x a\u{200D}b"), "a\u{200D}b".len());
        assert_eq!(last_cluster_len("\u{200D}"), 3);
    }

    #[test]
    fn test_last_cluster_len() {
        let text = format!("Running woman emoji: {}", RUNNING_WOMAN);
        assert_eq!(last_cluster_len(&text), RUNNING_WOMAN.len());
        assert_eq!(last_cluster_len("abc"), 1);
        assert_eq!(last_cluster_len("ab\u{00E9}"), 2);
        assert_eq!(last_cluster_len(""), 0);
        assert_eq!(last_cluster_len(&format!("a{}", FAMILY)), FAMILY.len());
        assert_eq!(last_cluster_len(&format!("a{}", FLAG_VG)), FLAG_VG.len());
    }

    #[test]
    fn test_word_start_index() {
        assert_eq!(word_start_index("word", ""), 0);
        assert_eq!(word_start_index("second word", ""), 7);
        assert_eq!(word_start_index("emoji\u{1F603}", ""), "emoji\u{1F603}".len());
        assert_eq!(word_start_index("don't", ""), 4);
        assert_eq!(word_start_index("don't", "'"), 0);
        assert_eq!(word_start_index("hello ", ""), 6);
    }

    #[test]
    fn test_is_letter_or_digit_and_space() {
        assert!(is_letter_or_digit_and_space("hi "));
        assert!(is_letter_or_digit_and_space("4 "));
        assert!(!is_letter_or_digit_and_space(". "));
        assert!(!is_letter_or_digit_and_space(" "));
        assert!(!is_letter_or_digit_and_space("hi"));
        assert!(!is_letter_or_digit_and_space("hi\n"));
    }

    #[test]
    fn test_capitalization() {
        assert_eq!(capitalization_type("HELLO"), Capitalization::AllUpper);
        assert_eq!(capitalization_type("Hello"), Capitalization::FirstUpper);
        assert_eq!(capitalization_type("hello"), Capitalization::None);
        assert_eq!(capitalization_type(""), Capitalization::None);

        assert_eq!(capitalize_first_letter("hello").as_deref(), Some("Hello"));
        assert_eq!(capitalize_first_letter("\u{00E9}t\u{00E9}").as_deref(), Some("\u{00C9}t\u{00E9}"));
        assert_eq!(capitalize_first_letter(""), None);
    }

    #[test]
    fn test_match_capitalization() {
        assert_eq!(match_capitalization("there", "Thier"), "There");
        assert_eq!(match_capitalization("there", "THIER"), "THERE");
        assert_eq!(match_capitalization("there", "thier"), "there");
    }

    #[test]
    fn test_fitzpatrick_variants() {
        let aware = ['\u{1F3C3}', '\u{1F468}'];
        assert_eq!(fitzpatrick_variants("\u{1F3C3}", &aware).len(), 6);
        assert_eq!(fitzpatrick_variants(RUNNING_WOMAN, &aware).len(), 6);
        assert_eq!(
            fitzpatrick_variants("\u{1F9B3}\u{200D}\u{1F468}\u{1F3FE}\u{1F33E}", &aware).len(),
            6
        );
        assert!(fitzpatrick_variants("\u{1F33E}", &aware).is_empty());

        let variants = fitzpatrick_variants(RUNNING_WOMAN, &aware);
        assert_eq!(variants[0], "\u{1F3C3}\u{200D}\u{2640}");
        assert_eq!(variants[1], "\u{1F3C3}\u{1F3FB}\u{200D}\u{2640}");
        assert_eq!(variants[5], "\u{1F3C3}\u{1F3FF}\u{200D}\u{2640}");
    }

    #[test]
    fn test_fitzpatrick_hands_only_first() {
        let aware = ['\u{1F91D}', '\u{1F9D1}'];
        let holding = "\u{1F9D1}\u{200D}\u{1F91D}\u{200D}\u{1F9D1}";
        let variants = fitzpatrick_variants(holding, &aware);
        assert_eq!(
            variants[1],
            "\u{1F9D1}\u{1F3FB}\u{200D}\u{1F91D}\u{200D}\u{1F9D1}\u{1F3FB}"
        );
    }
}
