//! Splitting long text into model-sized batches.
//!
//! Summarization models have a bounded context, so a book is summarized one
//! batch at a time. Token counts are approximated from whitespace-delimited
//! words (roughly 3 words for every 4 tokens), which keeps batching free of
//! any model-specific tokenizer.

const WORDS_PER_TOKEN_NUMERATOR: usize = 3;
const WORDS_PER_TOKEN_DENOMINATOR: usize = 4;

/// Maximum number of words that fit in a batch of `token_batch_length` tokens.
/// Always at least one, so batching makes progress.
pub fn words_per_batch(token_batch_length: usize) -> usize {
    (token_batch_length.saturating_mul(WORDS_PER_TOKEN_NUMERATOR) / WORDS_PER_TOKEN_DENOMINATOR).max(1)
}

/// Splits text into batches of at most [`words_per_batch`] words each.
///
/// Words are never split; whitespace between words is normalized to a single
/// space. Empty (or whitespace-only) text yields no batches.
///
/// # Examples
///
/// ```
/// use narrate_summarize::batches;
/// assert_eq!(batches("one two three four five", 4), vec!["one two three", "four five"]);
/// assert!(batches("", 4).is_empty());
/// ```
pub fn batches(text: &str, token_batch_length: usize) -> Vec<String> {
    let size = words_per_batch(token_batch_length);
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size).map(|chunk| chunk.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(3072, 2304)]
    #[case(4, 3)]
    #[case(1, 1)]
    #[case(0, 1)]
    #[case(usize::MAX, usize::MAX / 4)]
    fn test_words_per_batch(#[case] tokens: usize, #[case] expected: usize) {
        assert_eq!(words_per_batch(tokens), expected);
    }

    #[test]
    fn test_batches_never_split_words() {
        let text = "alpha beta\tgamma\n\ndelta   epsilon";
        assert_eq!(batches(text, 4), vec!["alpha beta gamma", "delta epsilon"]);
        assert_eq!(batches(text, 3072), vec!["alpha beta gamma delta epsilon"]);
        assert_eq!(batches(text, 1), vec!["alpha", "beta", "gamma", "delta", "epsilon"]);
    }

    #[test]
    fn test_batches_empty() {
        assert!(batches("", 3072).is_empty());
        assert!(batches(" \n\t ", 3072).is_empty());
    }

    #[test]
    fn test_batches_cover_all_words() {
        let text = (0..10_000).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let batches = batches(&text, 3072);
        assert_eq!(batches.len(), 5);
        assert!(batches.iter().all(|batch| batch.split(' ').count() <= 2304));
        assert_eq!(batches.join(" "), text);
    }
}
