pub mod semantic;

use serde::Serialize;

use crate::catalog::{Catalog, DiseaseRecord};
use crate::embed::cosine_similarity;

/// A catalog record with its similarity to the query, serialized with the
/// table's column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Symptoms")]
    pub symptoms: String,
    #[serde(rename = "Treatments")]
    pub treatments: String,
    #[serde(rename = "Contagious")]
    pub contagious: bool,
    #[serde(rename = "Chronic")]
    pub chronic: bool,
    #[serde(rename = "Similarity")]
    pub similarity: f64,
}

impl RankedResult {
    fn new(record: &DiseaseRecord, similarity: f32) -> Self {
        Self {
            name: record.name.clone(),
            symptoms: record.symptoms.clone(),
            treatments: record.treatments.clone(),
            contagious: record.contagious,
            chronic: record.chronic,
            similarity: round_similarity(similarity),
        }
    }
}

/// Lowercase and trim a query before it is embedded.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Resolve a requested result count: absent means `default`, anything below
/// 1 is raised to 1.
pub fn resolve_top_k(requested: Option<i64>, default: usize) -> usize {
    match requested {
        None => default.max(1),
        Some(n) if n < 1 => 1,
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
    }
}

/// Score every catalog row against `query` and keep the best `top_k`.
/// Equal scores keep catalog order.
pub fn rank(query: &[f32], catalog: &Catalog, top_k: usize) -> Vec<RankedResult> {
    let mut scored: Vec<(&DiseaseRecord, f32)> = catalog
        .entries()
        .map(|(record, embedding)| (record, cosine_similarity(query, embedding)))
        .collect();

    // sort_by is stable, so ties stay in row order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(record, similarity)| RankedResult::new(record, similarity))
        .collect()
}

fn round_similarity(similarity: f32) -> f64 {
    let s = f64::from(similarity).clamp(-1.0, 1.0);
    (s * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::npy::Matrix;
    use crate::catalog::tests::record;

    fn catalog(rows: &[(&str, Vec<f32>)]) -> Catalog {
        let records = rows.iter().map(|(name, _)| record(name)).collect();
        let vectors: Vec<Vec<f32>> = rows.iter().map(|(_, v)| v.clone()).collect();
        Catalog::new(records, Matrix::from_rows(&vectors).unwrap()).unwrap()
    }

    fn names(results: &[RankedResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn ties_keep_catalog_order() {
        // A and B both score 0.9 against [1, 0]; C scores 0.2.
        let tilt = (1.0f32 - 0.81).sqrt();
        let c = catalog(&[
            ("A", vec![0.9, tilt]),
            ("B", vec![0.9, tilt]),
            ("C", vec![0.2, (1.0f32 - 0.04).sqrt()]),
        ]);
        let results = rank(&[1.0, 0.0], &c, 2);
        assert_eq!(names(&results), ["A", "B"]);
        assert_eq!(results[0].similarity, 0.9);
        assert_eq!(results[1].similarity, 0.9);
    }

    #[test]
    fn tie_order_is_not_reversed_when_later_rows_tie() {
        let c = catalog(&[
            ("low", vec![0.0, 1.0]),
            ("first", vec![1.0, 0.0]),
            ("second", vec![2.0, 0.0]),
            ("third", vec![3.0, 0.0]),
        ]);
        let results = rank(&[1.0, 0.0], &c, 10);
        assert_eq!(names(&results), ["first", "second", "third", "low"]);
    }

    #[test]
    fn sorted_descending_and_bounded() {
        let c = catalog(&[
            ("far", vec![-1.0, 0.0]),
            ("near", vec![1.0, 0.1]),
            ("mid", vec![1.0, 1.0]),
        ]);
        let results = rank(&[1.0, 0.0], &c, 5);
        assert_eq!(names(&results), ["near", "mid", "far"]);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        assert!(results.iter().all(|r| (-1.0..=1.0).contains(&r.similarity)));
        assert_eq!(results[2].similarity, -1.0);
    }

    #[test]
    fn top_k_larger_than_catalog_returns_everything() {
        let c = catalog(&[("a", vec![1.0]), ("b", vec![-1.0])]);
        assert_eq!(rank(&[1.0], &c, 50).len(), 2);
    }

    #[test]
    fn top_k_truncates() {
        let c = catalog(&[("a", vec![1.0]), ("b", vec![0.5]), ("c", vec![0.2])]);
        assert_eq!(rank(&[1.0], &c, 1).len(), 1);
    }

    #[test]
    fn zero_query_scores_everything_zero() {
        let c = catalog(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let results = rank(&[0.0, 0.0], &c, 5);
        assert_eq!(names(&results), ["a", "b"]);
        assert!(results.iter().all(|r| r.similarity == 0.0));
    }

    #[test]
    fn similarity_is_rounded_to_four_places() {
        assert_eq!(round_similarity(0.123_456), 0.1235);
        assert_eq!(round_similarity(1.000_001), 1.0);
        assert_eq!(round_similarity(-0.999_99), -1.0);
    }

    #[test]
    fn result_serializes_with_column_names() {
        let c = catalog(&[("Flu", vec![1.0])]);
        let json = serde_json::to_value(&rank(&[1.0], &c, 1)[0]).unwrap();
        assert_eq!(json["Name"], "Flu");
        assert_eq!(json["Contagious"], false);
        assert_eq!(json["Similarity"], 1.0);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_text("  High FEVER\t\n"), "high fever");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["  Sore Throat ", "ÉTÉ Rash", "already normal", "   ", "İstanbul"] {
            let once = normalize_text(raw);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn top_k_policy() {
        assert_eq!(resolve_top_k(None, 5), 5);
        assert_eq!(resolve_top_k(Some(3), 5), 3);
        assert_eq!(resolve_top_k(Some(0), 5), 1);
        assert_eq!(resolve_top_k(Some(-4), 5), 1);
        assert_eq!(resolve_top_k(None, 0), 1);
        assert!(resolve_top_k(Some(i64::MAX), 5) >= u32::MAX as usize);
    }
}
