//! Multi-label tag vocabulary.

use std::collections::{BTreeSet, HashMap};

use super::{normalize_text, TagKind};

/// A fitted multi-label binarizer for one tag family.
///
/// The classes are the union of all label sets seen while fitting, sorted
/// lexicographically. Encoding the same tag set always yields the same vector
/// of length `len()`, whether the set came from catalog data or from a user.
#[derive(Debug, Clone, PartialEq)]
pub struct TagVocabulary {
    kind: TagKind,
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

/// Multi-hot encoding of a tag set plus any tags the vocabulary did not know.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiHot {
    pub values: Vec<f32>,
    pub unknown: Vec<String>,
}

impl TagVocabulary {
    /// Fit the vocabulary on a collection of label sets.
    pub fn fit<I, L, S>(kind: TagKind, label_sets: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = label_sets
            .into_iter()
            .flatten()
            .map(|tag| normalize_text(tag.as_ref()))
            .filter(|tag| !tag.is_empty())
            .collect();
        let classes: Vec<String> = classes.into_iter().collect();
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.clone(), i))
            .collect();
        Self { kind, classes, index }
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Fitted classes in column order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(&normalize_text(tag))
    }

    /// Schema column names, e.g. `atmosphere:cozy`.
    pub fn column_names(&self) -> Vec<String> {
        self.classes.iter().map(|tag| self.kind.column(tag)).collect()
    }

    /// Multi-hot encode a tag set. Unknown tags set no column and are reported.
    pub fn transform<S: AsRef<str>>(&self, tags: &[S]) -> MultiHot {
        let mut values = vec![0.0; self.classes.len()];
        let mut unknown = Vec::new();
        for tag in tags {
            let tag = normalize_text(tag.as_ref());
            match self.index.get(&tag) {
                Some(&i) => values[i] = 1.0,
                None => unknown.push(tag),
            }
        }
        MultiHot { values, unknown }
    }
}
