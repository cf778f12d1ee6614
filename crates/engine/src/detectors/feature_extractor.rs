//! Feature Extractor (C1): flattens an `InspectionRequest` into a typed,
//! fixed-schema `Features` map. No I/O; the only failure mode is bounded-
//! input rejection.

use crate::error::{Error, Result};
use crate::model::features::keys;
use crate::model::request::MAX_BODY_BYTES;
use crate::model::{FeatureValue, Features, InspectionRequest};
use chrono::{Datelike, Timelike};
use std::collections::HashMap;

pub fn extract_features(request: &InspectionRequest) -> Result<Features> {
    if request.body.len() > MAX_BODY_BYTES {
        return Err(Error::invalid_input(format!(
            "body of {} bytes exceeds the {} byte cap",
            request.body.len(),
            MAX_BODY_BYTES
        )));
    }

    let mut features = Features::new();

    features.insert(keys::REQUEST_SIZE, FeatureValue::Number(request.body.len() as f64));
    if let Some(response_size) = request.response_size {
        features.insert(keys::RESPONSE_SIZE, FeatureValue::Number(response_size as f64));
    }
    if let Some(response_time) = request.response_time {
        features.insert(keys::RESPONSE_TIME_MS, FeatureValue::Number(response_time.as_millis() as f64));
    }

    features.insert(keys::METHOD, FeatureValue::Text(request.method.clone()));
    features.insert(keys::PATH, FeatureValue::Text(request.path.clone()));
    features.insert(keys::PATH_DEPTH, FeatureValue::Number(path_depth(&request.path) as f64));
    features.insert(keys::PARAM_COUNT, FeatureValue::Number(param_count(&request.query) as f64));
    features.insert(keys::HEADER_COUNT, FeatureValue::Number(request.headers.len() as f64));

    if let Some(user_agent) = user_agent(&request.headers) {
        features.insert(keys::USER_AGENT_ENTROPY, FeatureValue::Number(shannon_entropy(user_agent)));
        features.insert(keys::USER_AGENT, FeatureValue::Text(user_agent.to_string()));
    }

    // Geo enrichment happens upstream (gateway/CDN); the engine only
    // consumes whatever the caller already resolved, never a resolver
    // itself.
    if let Some(country) = header(&request.headers, "x-geoip-country") {
        features.insert(keys::COUNTRY, FeatureValue::Text(country.to_string()));
    }
    if let Some(city) = header(&request.headers, "x-geoip-city") {
        features.insert(keys::CITY, FeatureValue::Text(city.to_string()));
    }

    features.insert(keys::HOUR_OF_DAY, FeatureValue::Number(request.observed_at.hour() as f64));
    features.insert(keys::DAY_OF_WEEK, FeatureValue::Number(request.observed_at.weekday().num_days_from_monday() as f64));
    features.insert(keys::CLIENT_IP, FeatureValue::Text(request.client_ip.clone()));

    if !request.query.is_empty() {
        features.insert(keys::QUERY, FeatureValue::Text(request.query.clone()));
    }
    if !request.body.is_empty() {
        features.insert(keys::BODY, FeatureValue::Text(String::from_utf8_lossy(&request.body).into_owned()));
    }

    Ok(features)
}

fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

fn param_count(query: &str) -> usize {
    if query.is_empty() {
        return 0;
    }
    query.split('&').filter(|s| !s.is_empty()).count()
}

fn user_agent(headers: &HashMap<String, String>) -> Option<&str> {
    header(headers, "user-agent")
}

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}

fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    let len = s.chars().count() as f64;
    counts.values().fold(0.0, |acc, &count| {
        let p = count as f64 / len;
        acc - p * p.log2()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn base_request() -> InspectionRequest {
        InspectionRequest {
            request_id: "r1".into(),
            observed_at: Utc::now(),
            client_ip: "203.0.113.5".into(),
            user_id: None,
            session_id: None,
            api_id: "api1".into(),
            endpoint_id: "E1".into(),
            method: "GET".into(),
            path: "/api/v1/items".into(),
            query: "a=1&b=2".into(),
            headers: HashMap::new(),
            body: Vec::new(),
            response_status: None,
            response_size: None,
            response_time: None,
        }
    }

    #[test]
    fn rejects_oversized_body() {
        let mut request = base_request();
        request.body = vec![0u8; MAX_BODY_BYTES + 1];
        assert!(extract_features(&request).is_err());
    }

    #[test]
    fn missing_fields_are_absent_not_zero() {
        let request = base_request();
        let features = extract_features(&request).unwrap();
        assert!(features.is_absent(keys::RESPONSE_SIZE));
        assert_eq!(features.number(keys::PATH_DEPTH), Some(3.0));
        assert_eq!(features.number(keys::PARAM_COUNT), Some(2.0));
    }

    #[test]
    fn user_agent_entropy_is_zero_for_repeated_char() {
        let mut request = base_request();
        request.headers.insert("User-Agent".into(), "aaaaaaaa".into());
        let features = extract_features(&request).unwrap();
        assert_eq!(features.number(keys::USER_AGENT_ENTROPY), Some(0.0));
    }

    #[test]
    fn country_is_read_from_upstream_geo_header_not_resolved() {
        let mut request = base_request();
        request.headers.insert("X-GeoIP-Country".into(), "RU".into());
        let features = extract_features(&request).unwrap();
        assert_eq!(features.text(keys::COUNTRY), Some("RU"));
        assert!(features.is_absent(keys::CITY));
    }
}
