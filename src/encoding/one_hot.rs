//! One-hot encoding of categorical columns.

use std::collections::{BTreeMap, HashSet};

/// A fitted one-hot encoder over a set of categorical columns.
///
/// Columns are visited in name order and categories in lexicographic order;
/// each `(column, category)` pair becomes a feature named
/// `<column>_<category>`. Features listed in `dropped` are left out entirely,
/// which is how the redundant low price level is kept out of the vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    /// column -> sorted categories
    categories: BTreeMap<String, Vec<String>>,
    dropped: HashSet<String>,
    feature_names: Vec<String>,
}

impl OneHotEncoder {
    /// Fit on the distinct values of each column, dropping the named features.
    pub fn fit<S: AsRef<str>>(categories: BTreeMap<String, Vec<String>>, dropped: &[S]) -> Self {
        let dropped: HashSet<String> = dropped.iter().map(|s| s.as_ref().to_string()).collect();
        let mut categories = categories;
        for values in categories.values_mut() {
            values.sort();
            values.dedup();
        }

        let feature_names = categories
            .iter()
            .flat_map(|(column, values)| values.iter().map(move |v| feature_name(column, v)))
            .filter(|name| !dropped.contains(name))
            .collect();

        Self {
            categories,
            dropped,
            feature_names,
        }
    }

    /// Output feature names, in vector order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// Encode one row. Unseen categories and absent columns encode as zeros.
    pub fn transform(&self, row: &BTreeMap<String, String>) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.feature_names.len());
        for (column, values) in &self.categories {
            let current = row.get(column);
            for value in values {
                if self.dropped.contains(&feature_name(column, value)) {
                    continue;
                }
                out.push(if current == Some(value) { 1.0 } else { 0.0 });
            }
        }
        out
    }
}

fn feature_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn encoder() -> OneHotEncoder {
        let mut categories = BTreeMap::new();
        categories.insert("price_point".to_string(), vec!["mid".into(), "high".into(), "low".into()]);
        categories.insert("neighborhood".to_string(), vec!["uptown".into(), "downtown".into()]);
        OneHotEncoder::fit(categories, &["price_point_low"])
    }

    #[test]
    fn test_feature_names_sorted_and_dropped() {
        assert_eq!(
            encoder().feature_names(),
            &[
                "neighborhood_downtown",
                "neighborhood_uptown",
                "price_point_high",
                "price_point_mid"
            ]
        );
    }

    #[test]
    fn test_transform() {
        let enc = encoder();
        assert_eq!(
            enc.transform(&row(&[("neighborhood", "uptown"), ("price_point", "mid")])),
            vec![0.0, 1.0, 0.0, 1.0]
        );
        // low is the dropped level: both price features stay zero
        assert_eq!(
            enc.transform(&row(&[("neighborhood", "downtown"), ("price_point", "low")])),
            vec![1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_transform_unseen_category() {
        let enc = encoder();
        assert_eq!(enc.transform(&row(&[("neighborhood", "harbor")])), vec![0.0; 4]);
        assert_eq!(enc.len(), 4);
    }
}
