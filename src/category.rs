//! Extension-based file categorization.
//!
//! A [`CategoryTable`] is an ordered list of categories, each owning a set of
//! lowercase extensions (with the leading dot). Lookups walk the table in
//! order and the first category that lists the extension wins.
//!
//! # Examples
//!
//! ```
//! use tidytree::category::{CategoryTable, OTHER_CATEGORY};
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.resolve(".png"), "images");
//! assert_eq!(table.resolve(".PDF"), "documents");
//! assert_eq!(table.resolve(".xyz"), OTHER_CATEGORY);
//! ```

use std::collections::BTreeSet;

/// Category returned for any extension no table entry claims.
pub const OTHER_CATEGORY: &str = "other";

/// A named group of file extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    extensions: BTreeSet<String>,
}

impl Category {
    /// Creates a category, normalizing every extension to lowercase with a
    /// leading dot.
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| ext.len() > 1)
                .collect(),
        }
    }

    /// The category label, also used as the directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized extensions owned by this category.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Returns true if this category lists the (already normalized) extension.
    fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }
}

/// Ordered mapping from category name to extension set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Builds a table from categories in lookup order.
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Resolves an extension to its category name.
    ///
    /// The extension is lowercased before lookup. An empty extension (a file
    /// without one) only matches if some category lists it, which a table
    /// built through [`Category::new`] never does, so it resolves to
    /// [`OTHER_CATEGORY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use tidytree::category::{Category, CategoryTable};
    ///
    /// let table = CategoryTable::new(vec![Category::new("pictures", [".jpg"])]);
    /// assert_eq!(table.resolve(".JPG"), "pictures");
    /// assert_eq!(table.resolve(""), "other");
    /// ```
    pub fn resolve(&self, extension: &str) -> &str {
        let extension = extension.to_lowercase();
        self.categories
            .iter()
            .find(|category| category.contains(&extension))
            .map(Category::name)
            .unwrap_or(OTHER_CATEGORY)
    }

    /// Iterates over the categories in lookup order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Category names in lookup order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(Category::name)
    }

    /// Category names plus [`OTHER_CATEGORY`] if the table does not already
    /// define it. This is the set of directories a full layout contains.
    pub fn layout_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names().collect();
        if !names.contains(&OTHER_CATEGORY) {
            names.push(OTHER_CATEGORY);
        }
        names
    }

    /// Extensions listed under more than one category.
    ///
    /// Each item is `(extension, winning category, shadowed category)`. The
    /// winning category is the one [`resolve`](Self::resolve) returns.
    pub fn duplicate_extensions(&self) -> Vec<(String, String, String)> {
        let mut duplicates = Vec::new();
        for (index, category) in self.categories.iter().enumerate() {
            for later in &self.categories[index + 1..] {
                for ext in category.extensions.intersection(&later.extensions) {
                    duplicates.push((
                        ext.clone(),
                        category.name.clone(),
                        later.name.clone(),
                    ));
                }
            }
        }
        duplicates
    }

    /// Number of categories in the table (excluding the implicit `other`).
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Returns true if the table has no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(vec![
            Category::new(
                "images",
                [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp"],
            ),
            Category::new(
                "documents",
                [".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt"],
            ),
            Category::new("videos", [".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv"]),
            Category::new("audio", [".mp3", ".wav", ".flac", ".aac", ".ogg"]),
            Category::new("archives", [".zip", ".rar", ".7z", ".tar", ".gz"]),
            Category::new(
                "code",
                [".py", ".js", ".html", ".css", ".cpp", ".java", ".c"],
            ),
            Category::new("spreadsheets", [".xls", ".xlsx", ".csv", ".ods"]),
        ])
    }
}

/// Lowercases an extension and makes sure it starts with a dot.
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
