//! Query option types for `Store::list` and `Store::count`

/// Result ordering for list queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Insertion order (ascending id)
    #[default]
    Insertion,
    /// Most recently updated first
    RecentlyUpdated,
    /// Most recently created first
    Newest,
}

impl SortOrder {
    pub(super) fn sql(&self) -> &'static str {
        match self {
            SortOrder::Insertion => "id ASC",
            SortOrder::RecentlyUpdated => "updated_at DESC, id DESC",
            SortOrder::Newest => "id DESC",
        }
    }
}

/// Filter for list/count queries
///
/// Equality conditions are AND-ed together. Column names are checked against
/// the record's declared columns before any SQL is built.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub(super) conditions: Vec<(String, String)>,
    pub(super) search: Option<String>,
    pub(super) order: SortOrder,
    pub(super) limit: Option<usize>,
}

impl ListFilter {
    /// Match every record, insertion order
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column = value`
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.conditions.push((column.to_string(), value.to_string()));
        self
    }

    /// Require `column = value` when `value` is present
    pub fn eq_opt<T: ToString>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// Case-insensitive substring match on the record's title column
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.search = Some(text);
        }
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order
    }
}
