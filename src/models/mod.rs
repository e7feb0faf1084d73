//! Data models for grants searches.

mod grant;
mod search;

pub use grant::{is_id_field, FieldValue, GrantRecord, ResultSet, ID_COLUMN};
pub use search::{
    clamp_page_size, SearchFilters, SearchParams, DEFAULT_PAGE_SIZE, FILTER_PARAM,
    MAX_PAGE_SIZE, PAGE_NUMBER_PARAM, PAGE_SIZE_PARAM,
};
