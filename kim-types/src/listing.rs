//! Listing options and pagination shared by topic and group listings.

/// Sort direction for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse "asc"/"desc" (case-insensitive). Anything else is ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn is_desc(self) -> bool {
        self == SortOrder::Desc
    }
}

/// Filtering, sorting and paging options for a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListOptions {
    /// 1-based page number.
    pub page: usize,
    /// Items per page.
    pub page_size: usize,
    /// Case-insensitive name filter; `*` wildcards are ignored.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub pattern: Option<String>,
    /// Field to sort by; each listing documents the names it accepts.
    pub sort_by: String,
    pub order: SortOrder,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            pattern: None,
            sort_by: "name".to_string(),
            order: SortOrder::Asc,
        }
    }
}

impl ListOptions {
    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = field.into();
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Position of a page within a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_items: usize,
}

impl Pagination {
    /// Slice `items` according to `opts` and describe the resulting page.
    ///
    /// Page numbers below 1 are treated as 1 and a zero page size as 1, so the
    /// returned range is always within `items`.
    pub fn paginate<T>(items: Vec<T>, opts: &ListOptions) -> (Vec<T>, Pagination) {
        let page = opts.page.max(1);
        let page_size = opts.page_size.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(page_size);

        let start = ((page - 1) * page_size).min(total_items);
        let end = (start + page_size).min(total_items);

        let page_items = items.into_iter().skip(start).take(end - start).collect();
        (
            page_items,
            Pagination {
                current_page: page,
                total_pages,
                page_size,
                total_items,
            },
        )
    }
}
