//! Vector and string similarity measures

use mcq_core::StringSimilarity;

/// Cosine similarity of two vectors
///
/// Returns 0.0 for mismatched lengths or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Normalized Levenshtein similarity
///
/// `1 - distance / max(len_a, len_b)` over chars; two empty strings are
/// identical. Inputs are truncated to `max_len` chars before comparison.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedLevenshtein {
    max_len: usize,
}

impl NormalizedLevenshtein {
    pub fn new() -> Self {
        Self { max_len: 10_000 }
    }

    /// Raw edit distance
    pub fn distance(&self, a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().take(self.max_len).collect();
        let b: Vec<char> = b.chars().take(self.max_len).collect();
        let (m, n) = (a.len(), b.len());

        if m == 0 {
            return n;
        }
        if n == 0 {
            return m;
        }

        // Two-row DP
        let mut prev: Vec<usize> = (0..=n).collect();
        let mut curr = vec![0usize; n + 1];

        for i in 1..=m {
            curr[0] = i;
            for j in 1..=n {
                let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
                curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        prev[n]
    }

    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        let len_a = a.chars().take(self.max_len).count();
        let len_b = b.chars().take(self.max_len).count();
        let max_len = len_a.max(len_b);

        if max_len == 0 {
            return 1.0;
        }

        1.0 - self.distance(a, b) as f32 / max_len as f32
    }
}

impl Default for NormalizedLevenshtein {
    fn default() -> Self {
        Self::new()
    }
}

impl StringSimilarity for NormalizedLevenshtein {
    fn edit_similarity(&self, a: &str, b: &str) -> f32 {
        self.similarity(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_levenshtein_identical() {
        let lev = NormalizedLevenshtein::new();
        assert_eq!(lev.edit_similarity("paris", "paris"), 1.0);
        assert_eq!(lev.edit_similarity("", ""), 1.0);
    }

    #[test]
    fn test_levenshtein_one_empty() {
        let lev = NormalizedLevenshtein::new();
        assert_eq!(lev.edit_similarity("abc", ""), 0.0);
        assert_eq!(lev.edit_similarity("", "xyz"), 0.0);
    }

    #[test]
    fn test_levenshtein_partial() {
        let lev = NormalizedLevenshtein::new();
        assert_eq!(lev.distance("kitten", "sitting"), 3);
        assert!((lev.edit_similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-6);
        assert!(lev.edit_similarity("france", "frances") > 0.7);
        assert!(lev.edit_similarity("paris", "london") < 0.7);
    }
}
