//! Edit-distance text similarity.
//!
//! The engine is case-sensitive: callers lower-case both sides first when
//! they want case-insensitive comparison.

/// Characters removed before comparison.
pub const PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '¿', '¡', '"', '\'', '(', ')', '«', '»', '„', '“', '”', '-',
    '…',
];

/// Strip punctuation, collapse whitespace runs to one space and trim.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !PUNCTUATION.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein distance over Unicode scalar values with unit costs.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows instead of the full matrix.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Similarity in `[0, 1]` after normalization; `1.0` when both sides are empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein(&a, &b);
    ((max_len as f64 - distance as f64) / max_len as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_is_ignored() {
        assert_eq!(normalize("  ¿Cómo   estás?! "), "Cómo estás");
        assert!((similarity("ahoj", "ahoj!") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn identical_and_empty_inputs_match_fully() {
        for text in ["", "dobrý den", "...", "Děkuji moc"] {
            assert!((similarity(text, text) - 1.0).abs() < f64::EPSILON, "{text}");
        }
        assert!((similarity("", "?!") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn distance_counts_unicode_scalars() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("děkuji", "dekuji"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn similarity_is_symmetric_and_deterministic() {
        let pairs = [
            ("dobrý večer", "dobry vecer"),
            ("ahoj", "nashledanou"),
            ("", "jedna"),
            ("prosím", "prosim!"),
        ];
        for (a, b) in pairs {
            let ab = similarity(a, b);
            assert_eq!(ab, similarity(b, a));
            assert_eq!(ab, similarity(a, b));
            assert!((0.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn partial_match_is_scaled_by_longest_input() {
        // "ahoj" vs "aho": one deletion over max length 4.
        assert!((similarity("ahoj", "aho") - 0.75).abs() < 1e-9);
        assert!(similarity("abc", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn engine_is_case_sensitive() {
        assert!(similarity("Ahoj", "ahoj") < 1.0);
    }
}
