use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A typed feature value. Numeric conversions clamp at extraction time;
/// there is no "default zero" — a feature that was not observed is simply
/// absent from the map, distinct from any explicit zero or empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Fixed-schema key names.
pub mod keys {
    pub const REQUEST_SIZE: &str = "request_size";
    pub const RESPONSE_SIZE: &str = "response_size";
    pub const RESPONSE_TIME_MS: &str = "response_time_ms";
    pub const METHOD: &str = "method";
    pub const PATH: &str = "path";
    pub const PATH_DEPTH: &str = "path_depth";
    pub const PARAM_COUNT: &str = "param_count";
    pub const HEADER_COUNT: &str = "header_count";
    pub const USER_AGENT: &str = "user_agent";
    pub const USER_AGENT_ENTROPY: &str = "user_agent_entropy";
    pub const HOUR_OF_DAY: &str = "hour_of_day";
    pub const DAY_OF_WEEK: &str = "day_of_week";
    pub const CLIENT_IP: &str = "client_ip";
    pub const COUNTRY: &str = "country";
    pub const CITY: &str = "city";
    pub const QUERY: &str = "query";
    pub const BODY: &str = "body";
}

/// Transient, per-decision map from feature name to typed value. A missing
/// key means "absent", distinct from any numeric zero or empty string.
#[derive(Debug, Clone, Default)]
pub struct Features {
    values: HashMap<&'static str, FeatureValue>,
}

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: FeatureValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&FeatureValue> {
        self.values.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FeatureValue::as_number)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FeatureValue::as_text)
    }

    pub fn is_absent(&self, key: &str) -> bool {
        !self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &FeatureValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_distinct_from_zero() {
        let mut f = Features::new();
        f.insert(keys::RESPONSE_SIZE, FeatureValue::Number(0.0));
        assert_eq!(f.number(keys::RESPONSE_SIZE), Some(0.0));
        assert!(f.is_absent(keys::REQUEST_SIZE));
        assert_eq!(f.number(keys::REQUEST_SIZE), None);
    }
}
