//! Rule/Signature Matcher (C2): evaluates the cached, priority-sorted
//! signature set against the current features and raw request fields.
//! Regexes are precompiled once at cache-load time, keyed by
//! `(signature_id, rule_id)`; the matcher itself never compiles or
//! mutates anything.

use crate::model::{MatchedSignature, Operator, Rule, Signature};
use regex::Regex;
use std::collections::HashMap;

/// A precompiled regex keyed by `(signature_id, rule_id)`, built once when
/// the cache loads a new signature snapshot.
#[derive(Default)]
pub struct CompiledRegexes {
    patterns: HashMap<(String, String), Regex>,
}

impl CompiledRegexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles every `regex` rule in `signatures`, dropping (and
    /// reporting) any that fail to compile instead of letting them
    /// silently disable the signature at evaluation time.
    pub fn build(signatures: &[Signature]) -> (Self, Vec<String>) {
        let mut compiled = Self::new();
        let mut warnings = Vec::new();

        for signature in signatures {
            for rule in &signature.rules {
                if rule.operator != Operator::Regex {
                    continue;
                }
                match Regex::new(&rule.value) {
                    Ok(re) => {
                        compiled.patterns.insert((signature.signature_id.clone(), rule.rule_id.clone()), re);
                    }
                    Err(err) => warnings.push(format!(
                        "signature {} rule {}: failed to compile regex {:?}: {}",
                        signature.signature_id, rule.rule_id, rule.value, err
                    )),
                }
            }
        }

        (compiled, warnings)
    }

    fn get(&self, signature_id: &str, rule_id: &str) -> Option<&Regex> {
        self.patterns.get(&(signature_id.to_string(), rule_id.to_string()))
    }
}

/// A single request field the matcher can evaluate rules against.
pub struct MatchFields<'a> {
    pub query: &'a str,
    pub body: &'a str,
    pub path: &'a str,
    pub user_agent: &'a str,
    pub headers: &'a HashMap<String, String>,
}

pub struct SignatureMatcher;

impl SignatureMatcher {
    /// Signatures must already be sorted by descending priority — the
    /// matcher does not sort, it only evaluates in the order given.
    pub fn matches(signatures: &[Signature], regexes: &CompiledRegexes, fields: &MatchFields) -> Vec<MatchedSignature> {
        let mut matched = Vec::new();

        for signature in signatures.iter().filter(|s| s.enabled) {
            if let Some((field, value)) = Self::evaluate_signature(signature, regexes, fields) {
                matched.push(MatchedSignature {
                    signature_id: signature.signature_id.clone(),
                    category: signature.category.clone(),
                    severity: signature.severity,
                    confidence: signature.confidence,
                    matched_field: field,
                    matched_value: value,
                });
            }
        }

        matched
    }

    fn evaluate_signature(signature: &Signature, regexes: &CompiledRegexes, fields: &MatchFields) -> Option<(String, String)> {
        let mut last_match: Option<(String, String)> = None;

        for rule in &signature.rules {
            let field_value = Self::field_value(&rule.field, fields)?;
            if !Self::evaluate_rule(rule, &field_value, regexes, &signature.signature_id) {
                return None;
            }
            last_match = Some((rule.field.clone(), field_value));
        }

        last_match
    }

    fn field_value(field: &str, fields: &MatchFields) -> Option<String> {
        match field {
            "query" => Some(fields.query.to_string()),
            "body" => Some(fields.body.to_string()),
            "path" => Some(fields.path.to_string()),
            "user_agent" => Some(fields.user_agent.to_string()),
            header if header.starts_with("header:") => {
                let name = &header["header:".len()..];
                fields.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.clone())
            }
            _ => None,
        }
    }

    fn evaluate_rule(rule: &Rule, value: &str, regexes: &CompiledRegexes, signature_id: &str) -> bool {
        match rule.operator {
            Operator::Equals => Self::cmp_eq(value, &rule.value, rule.case_insensitive),
            Operator::NotEquals => !Self::cmp_eq(value, &rule.value, rule.case_insensitive),
            Operator::Contains => value.to_lowercase().contains(&rule.value.to_lowercase()),
            Operator::NotContains => !value.to_lowercase().contains(&rule.value.to_lowercase()),
            Operator::StartsWith => value.starts_with(&rule.value),
            Operator::EndsWith => value.ends_with(&rule.value),
            Operator::Regex => regexes.get(signature_id, &rule.rule_id).map(|re| re.is_match(value)).unwrap_or(false),
            Operator::LengthGt => rule.int_value.map(|n| value.len() as i64 > n).unwrap_or(false),
            Operator::LengthLt => rule.int_value.map(|n| (value.len() as i64) < n).unwrap_or(false),
        }
    }

    fn cmp_eq(a: &str, b: &str, case_insensitive: bool) -> bool {
        if case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }
}
