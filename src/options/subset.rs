use std::collections::HashMap;

use super::Category;

/// Selects which copy of a split category's options to read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Subset {
    /// Read the plain, unprefixed options.
    #[default]
    None,
    /// Read the options prefixed with this name in every split category.
    Name(String),
    /// Read a different subset per category. Categories missing from the map read the plain options.
    PerCategory(HashMap<Category, String>),
}

impl Subset {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn per_category<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Category, S)>,
        S: Into<String>,
    {
        Self::PerCategory(entries.into_iter().map(|(c, s)| (c, s.into())).collect())
    }

    /// The subset name requested for `category`, if any.
    pub fn for_category(&self, category: Category) -> Option<&str> {
        match self {
            Subset::None => None,
            Subset::Name(name) => Some(name.as_str()),
            Subset::PerCategory(map) => map.get(&category).map(String::as_str),
        }
    }

    /// The name used to label log lines about the learning rate.
    pub fn display_name(&self) -> Option<&str> {
        self.for_category(Category::Optimizer)
            .filter(|name| !name.is_empty())
    }

    /// The ` (name)` suffix appended to learning rate log lines, or an empty string.
    pub(crate) fn log_suffix(&self) -> String {
        match self.display_name() {
            Some(name) => format!(" ({name})"),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_applies_to_every_category() {
        let subset = Subset::name("gen");
        for category in Category::ALL {
            assert_eq!(subset.for_category(category), Some("gen"));
        }
    }

    #[test]
    fn per_category_display_uses_the_optimizer_entry() {
        let subset = Subset::per_category([
            (Category::Optimizer, "gen"),
            (Category::General, "shared"),
        ]);

        assert_eq!(subset.for_category(Category::Scheduler), None);
        assert_eq!(subset.display_name(), Some("gen"));
        assert_eq!(subset.log_suffix(), " (gen)");
    }

    #[test]
    fn no_subset_has_no_suffix() {
        assert_eq!(Subset::None.log_suffix(), "");
        assert_eq!(Subset::name("").log_suffix(), "");
    }
}
