use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::normalize_term;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: BTreeSet<String>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId(id.into()),
            name: name.into(),
            description: String::new(),
            category: category.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Tags are stored normalized; blanks are dropped.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn normalized_category(&self) -> String {
        normalize_term(&self.category)
    }
}

pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| normalize_term(tag.as_ref()))
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::Product;

    #[test]
    fn tags_are_normalized_and_deduplicated() {
        let product =
            Product::new("p-latte", "Latte", "Coffee").with_tags(["Milk", " milk ", "", "HOT"]);

        let tags = product.tags.iter().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(tags, vec!["hot", "milk"]);
        assert_eq!(product.normalized_category(), "coffee");
    }
}
