//! Vector similarity.

/// Cosine similarity between two embeddings.
///
/// Returns `None` when the vectors differ in length, are empty, or either has
/// zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let similarity = dot_product / (norm_a * norm_b);
    similarity.is_finite().then(|| similarity.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).unwrap().abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d).unwrap() + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_undefined_cases() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), None);
    }

    fn vector(len: usize) -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-100.0f32..100.0, len)
    }

    proptest! {
        #[test]
        fn cosine_is_symmetric((a, b) in (1usize..32).prop_flat_map(|n| (vector(n), vector(n)))) {
            prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        }

        #[test]
        fn cosine_of_self_is_one(a in vector(16)) {
            prop_assume!(a.iter().any(|x| x.abs() > 1e-3));
            let sim = cosine_similarity(&a, &a).unwrap();
            prop_assert!((sim - 1.0).abs() < 1e-4);
        }
    }
}
