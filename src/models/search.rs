//! Search filters and the query parameters built from them.

use serde::{Deserialize, Serialize};

use crate::error::GrantsError;

/// Largest page the API will serve
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Page size used when none is requested
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Query-string key for the filter expression
pub const FILTER_PARAM: &str = "filter";

/// Query-string key for the page size
pub const PAGE_SIZE_PARAM: &str = "page[size]";

/// Query-string key for the 1-based page number
pub const PAGE_NUMBER_PARAM: &str = "page[number]";

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`
pub fn clamp_page_size(requested: i64) -> u32 {
    requested.clamp(1, MAX_PAGE_SIZE as i64) as u32
}

/// User-level search filters.
///
/// Every field is optional; unset fields never reach the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Free-text query, passed through verbatim (the API parses its own operators)
    pub search: Option<String>,

    /// Scheme name (e.g. "Discovery Projects")
    pub scheme: Option<String>,

    /// Administering organisation name
    pub admin_org: Option<String>,

    /// Administering organisation short name
    pub admin_org_short: Option<String>,

    /// Grant status (Active, Closed, ...)
    pub status: Option<String>,

    /// Funding commencement year, lower bound
    pub year_from: Option<u16>,

    /// Funding commencement year, upper bound
    pub year_to: Option<u16>,

    /// Minimum funding amount
    pub funding_from: Option<u64>,

    /// Maximum funding amount
    pub funding_to: Option<u64>,

    /// Only grants that carry a fellowship
    pub fellowships_only: Option<bool>,

    /// Only grants on the LIEF register
    pub lief_register: Option<bool>,

    /// 4-digit Field of Research code
    pub four_digit_for: Option<String>,

    /// 2-digit Field of Research code
    pub two_digit_for: Option<String>,
}

impl SearchFilters {
    /// Create filters with a free-text query
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Default::default()
        }
    }

    /// Set the scheme filter
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Set the administering organisation filter
    pub fn admin_org(mut self, org: impl Into<String>) -> Self {
        self.admin_org = Some(org.into());
        self
    }

    /// Set the status filter
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the commencement year range
    pub fn years(mut self, from: Option<u16>, to: Option<u16>) -> Self {
        self.year_from = from;
        self.year_to = to;
        self
    }

    /// Set the funding amount range
    pub fn funding(mut self, from: Option<u64>, to: Option<u64>) -> Self {
        self.funding_from = from;
        self.funding_to = to;
        self
    }

    /// Set the fellowships-only flag
    pub fn fellowships_only(mut self, flag: bool) -> Self {
        self.fellowships_only = Some(flag);
        self
    }

    /// Set the LIEF register flag
    pub fn lief_register(mut self, flag: bool) -> Self {
        self.lief_register = Some(flag);
        self
    }

    /// Set the 4-digit Field of Research code
    pub fn four_digit_for(mut self, code: impl Into<String>) -> Self {
        self.four_digit_for = Some(code.into());
        self
    }

    /// Set the 2-digit Field of Research code
    pub fn two_digit_for(mut self, code: impl Into<String>) -> Self {
        self.two_digit_for = Some(code.into());
        self
    }

    /// Reject inverted ranges
    pub fn validate(&self) -> Result<(), GrantsError> {
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(GrantsError::InvalidArgument(format!(
                    "year-from ({}) is after year-to ({})",
                    from, to
                )));
            }
        }
        if let (Some(from), Some(to)) = (self.funding_from, self.funding_to) {
            if from > to {
                return Err(GrantsError::InvalidArgument(format!(
                    "funding-from ({}) is greater than funding-to ({})",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// `key="value"` clauses for every supplied filter, in a fixed order
    pub fn clauses(&self) -> Vec<String> {
        let text = [
            ("scheme", &self.scheme),
            ("admin-org-name", &self.admin_org),
            ("admin-org-short-name", &self.admin_org_short),
            ("status", &self.status),
        ];
        let years = [("year-from", self.year_from), ("year-to", self.year_to)];
        let funding = [
            ("funding-from", self.funding_from),
            ("funding-to", self.funding_to),
        ];
        let flags = [
            ("fellowships-only", self.fellowships_only),
            ("lief-register", self.lief_register),
        ];
        let codes = [
            ("four-digit-for", &self.four_digit_for),
            ("two-digit-for", &self.two_digit_for),
        ];

        let mut clauses = Vec::new();
        for (key, value) in text {
            if let Some(value) = non_blank(value) {
                clauses.push(clause(key, value));
            }
        }
        for (key, value) in years {
            if let Some(value) = value {
                clauses.push(clause(key, value));
            }
        }
        for (key, value) in funding {
            if let Some(value) = value {
                clauses.push(clause(key, value));
            }
        }
        for (key, value) in flags {
            if let Some(value) = value {
                clauses.push(clause(key, value));
            }
        }
        for (key, value) in codes {
            if let Some(value) = non_blank(value) {
                clauses.push(clause(key, value));
            }
        }
        clauses
    }

    /// The `filter` expression: `<text> => (<clauses>)`, or `None` when nothing is set
    pub fn filter_expression(&self) -> Option<String> {
        let text = non_blank(&self.search);
        let clauses = self.clauses();

        match (text, clauses.is_empty()) {
            (Some(text), false) => Some(format!("{} => ({})", text, clauses.join(" AND "))),
            (None, false) => Some(format!("=> ({})", clauses.join(" AND "))),
            (Some(text), true) => Some(text.to_string()),
            (None, true) => None,
        }
    }

    /// Validate and freeze into request parameters
    pub fn build(&self, page_size: i64) -> Result<SearchParams, GrantsError> {
        self.validate()?;
        Ok(SearchParams::new(self.filter_expression(), page_size))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn clause(key: &str, value: impl std::fmt::Display) -> String {
    format!("{}=\"{}\"", key, value)
}

/// Immutable request parameters shared by every page of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    filter: Option<String>,
    page_size: u32,
}

impl SearchParams {
    /// Create parameters; the page size is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(filter: Option<String>, page_size: i64) -> Self {
        Self {
            filter,
            page_size: clamp_page_size(page_size),
        }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Query-string pairs for one page
    pub fn query_pairs(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (PAGE_SIZE_PARAM, self.page_size.to_string()),
            (PAGE_NUMBER_PARAM, page.to_string()),
        ];
        if let Some(filter) = &self.filter {
            pairs.push((FILTER_PARAM, filter.clone()));
        }
        pairs
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new(None, DEFAULT_PAGE_SIZE as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_means_no_filter_param() {
        let params = SearchFilters::default().build(100).unwrap();
        assert_eq!(params.filter(), None);

        let keys: Vec<_> = params.query_pairs(1).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![PAGE_SIZE_PARAM, PAGE_NUMBER_PARAM]);
    }

    #[test]
    fn test_search_text_only_is_verbatim() {
        let filters = SearchFilters::new("climate AND (change OR adaptation)");
        assert_eq!(
            filters.filter_expression().as_deref(),
            Some("climate AND (change OR adaptation)")
        );
    }

    #[test]
    fn test_clauses_only() {
        let filters = SearchFilters::default()
            .scheme("Discovery Projects")
            .status("Active");
        assert_eq!(
            filters.filter_expression().as_deref(),
            Some(r#"=> (scheme="Discovery Projects" AND status="Active")"#)
        );
    }

    #[test]
    fn test_search_with_clauses() {
        let filters = SearchFilters::new("coral reef")
            .years(Some(2018), Some(2022))
            .funding(Some(100000), None)
            .fellowships_only(true)
            .four_digit_for("3103");
        assert_eq!(
            filters.filter_expression().as_deref(),
            Some(
                r#"coral reef => (year-from="2018" AND year-to="2022" AND funding-from="100000" AND fellowships-only="true" AND four-digit-for="3103")"#
            )
        );
    }

    #[test]
    fn test_unsupplied_options_are_omitted() {
        let filters = SearchFilters::default()
            .admin_org("The University of Sydney")
            .lief_register(false);
        let clauses = filters.clauses();
        assert_eq!(
            clauses,
            vec![
                r#"admin-org-name="The University of Sydney""#.to_string(),
                r#"lief-register="false""#.to_string(),
            ]
        );
        for key in ["scheme", "status", "year-from", "funding-to", "two-digit-for"] {
            assert!(clauses.iter().all(|c| !c.starts_with(key)), "{} leaked", key);
        }
    }

    #[test]
    fn test_blank_strings_count_as_unset() {
        let filters = SearchFilters {
            search: Some("   ".to_string()),
            scheme: Some(String::new()),
            two_digit_for: Some("31".to_string()),
            ..Default::default()
        };
        assert_eq!(
            filters.filter_expression().as_deref(),
            Some(r#"=> (two-digit-for="31")"#)
        );
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(clamp_page_size(-5), 1);
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(1), 1);
        assert_eq!(clamp_page_size(250), 250);
        assert_eq!(clamp_page_size(1000), 1000);
        assert_eq!(clamp_page_size(5000), 1000);
        assert_eq!(SearchParams::new(None, 0).page_size(), 1);
    }

    #[test]
    fn test_inverted_ranges_are_rejected() {
        let years = SearchFilters::default().years(Some(2022), Some(2018));
        assert!(matches!(
            years.build(100),
            Err(GrantsError::InvalidArgument(_))
        ));

        let funding = SearchFilters::default().funding(Some(10), Some(5));
        assert!(matches!(
            funding.build(100),
            Err(GrantsError::InvalidArgument(_))
        ));

        let equal = SearchFilters::default().years(Some(2020), Some(2020));
        assert!(equal.build(100).is_ok());
    }

    #[test]
    fn test_query_pairs_include_page_and_filter() {
        let params = SearchFilters::new("climate change").build(100).unwrap();
        assert_eq!(
            params.query_pairs(3),
            vec![
                (PAGE_SIZE_PARAM, "100".to_string()),
                (PAGE_NUMBER_PARAM, "3".to_string()),
                (FILTER_PARAM, "climate change".to_string()),
            ]
        );
    }
}
