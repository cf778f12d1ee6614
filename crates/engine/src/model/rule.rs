use serde::{Deserialize, Serialize};

/// Closed enumeration of rule operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    LengthGt,
    LengthLt,
}

/// One clause of a [`super::Signature`]. `int_value` is required (and must
/// be `> 0` at load time) for `LengthGt`/`LengthLt`; `case_insensitive`
/// applies to `Equals`/`NotEquals` only — `Contains` is always
/// case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub field: String,
    pub operator: Operator,
    pub value: String,
    pub int_value: Option<i64>,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl Rule {
    pub fn new(rule_id: impl Into<String>, field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            field: field.into(),
            operator,
            value: value.into(),
            int_value: None,
            case_insensitive: false,
        }
    }

    pub fn with_int_value(mut self, v: i64) -> Self {
        self.int_value = Some(v);
        self
    }

    pub fn with_case_insensitive(mut self, v: bool) -> Self {
        self.case_insensitive = v;
        self
    }

    /// Length-comparison rules require a positive `int_value` at load
    /// time; a rule failing this check is dropped with a warning instead
    /// of being evaluated.
    pub fn is_well_formed(&self) -> bool {
        match self.operator {
            Operator::LengthGt | Operator::LengthLt => matches!(self.int_value, Some(v) if v > 0),
            _ => true,
        }
    }
}
