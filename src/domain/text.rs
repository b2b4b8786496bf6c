use itertools::Itertools;

/// Keeps at most `max_words` whitespace separated words of `text`.
///
/// Text already within budget is returned untouched, including its original
/// spacing. Longer text is cut and rejoined with single spaces.
pub fn limit_words(text: &str, max_words: usize) -> String {
    if text.split_whitespace().count() <= max_words {
        return text.to_string();
    }

    text.split_whitespace().take(max_words).join(" ")
}
