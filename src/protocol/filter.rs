//! Subscription filter expressions

use serde::{Deserialize, Serialize};

/// Content of a tag filter that accepts every message
pub const MATCH_ALL: &str = "*";

/// Kind of predicate the broker evaluates
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FilterType {
    /// `||`-separated tag list, `*` for everything
    Tag,
    /// SQL92-like predicate over message properties
    Sql,
}

/// Filter applied by the broker when popping messages
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterExpression {
    pub filter_type: FilterType,
    pub content: String,
}

impl FilterExpression {
    pub fn new(filter_type: FilterType, content: impl Into<String>) -> Self {
        Self {
            filter_type,
            content: content.into(),
        }
    }

    pub fn tag(content: impl Into<String>) -> Self {
        Self::new(FilterType::Tag, content)
    }

    pub fn sql(content: impl Into<String>) -> Self {
        Self::new(FilterType::Sql, content)
    }

    pub fn match_all() -> Self {
        Self::tag(MATCH_ALL)
    }
}

impl Default for FilterExpression {
    fn default() -> Self {
        Self::match_all()
    }
}
