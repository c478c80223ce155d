use std::collections::BTreeSet;

use crate::domain::normalize_term;
use crate::domain::product::{Product, ProductId};

/// Catalog filter shared by every strategy.
///
/// A product matches when it is not excluded and satisfies at least one of
/// the populated criteria: its category is listed, one of its tags is
/// listed, or its name or description contains one of the text terms.
/// All comparisons use [`normalize_term`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub exclude: BTreeSet<ProductId>,
    pub categories: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub text_terms: BTreeSet<String>,
}

impl CatalogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn excluding<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = ProductId>,
    {
        self.exclude.extend(ids);
        self
    }

    pub fn in_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories.extend(normalized(categories));
        self
    }

    pub fn with_any_tag<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.extend(normalized(tags));
        self
    }

    pub fn containing_any<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.text_terms.extend(normalized(terms));
        self
    }

    /// A query without criteria matches nothing.
    pub fn has_criteria(&self) -> bool {
        !(self.categories.is_empty() && self.tags.is_empty() && self.text_terms.is_empty())
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.exclude.contains(&product.id) {
            return false;
        }

        if self.categories.contains(&product.normalized_category()) {
            return true;
        }

        if product.tags.iter().any(|tag| self.tags.contains(&normalize_term(tag))) {
            return true;
        }

        if self.text_terms.is_empty() {
            return false;
        }
        let name = product.name.to_ascii_lowercase();
        let description = product.description.to_ascii_lowercase();
        self.text_terms.iter().any(|term| name.contains(term) || description.contains(term))
    }
}

fn normalized<I, S>(values: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().map(|value| normalize_term(value.as_ref())).filter(|value| !value.is_empty())
}
