use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::application::{AppError, AppResult, EligibilityClient, WatchUser};
use crate::domain::{Eligibility, EventId, Restriction};

/// Eligibility client for the front desk HTTP API.
pub struct FrontDeskClient {
    client: reqwest::Client,
    base_url: String,
}

impl FrontDeskClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn eligibility_url(&self, event: &EventId) -> String {
        format!(
            "{}/api/v2/front/event_occurrences/{}/enrollment_eligibilities",
            self.base_url, event
        )
    }
}

#[derive(Debug, Deserialize)]
struct EligibilityResp {
    #[serde(default)]
    enrollment_eligibilities: Vec<EligibilityRecord>,
}

#[derive(Debug, Deserialize)]
struct EligibilityRecord {
    can_enroll: bool,
    #[serde(default)]
    restrictions: Vec<Restriction>,
}

/// Decode a response body. Only the first eligibility record is used.
pub fn parse_eligibility(body: &[u8]) -> AppResult<Eligibility> {
    let resp: EligibilityResp =
        serde_json::from_slice(body).map_err(|e| AppError::Eligibility(e.to_string()))?;

    let first = resp
        .enrollment_eligibilities
        .into_iter()
        .next()
        .ok_or_else(|| AppError::MalformedResponse("no enrollment eligibility records".into()))?;

    Ok(Eligibility {
        can_enroll: first.can_enroll,
        restrictions: first.restrictions,
    })
}

#[async_trait]
impl EligibilityClient for FrontDeskClient {
    async fn check(&self, user: &WatchUser, event: &EventId) -> AppResult<Eligibility> {
        let url = self.eligibility_url(event);
        debug!(user = %user.id, url = %url, "checking eligibility");

        let mut req = self
            .client
            .get(url)
            .header(USER_AGENT, "enrollwatch")
            .header(ACCEPT, "application/json");

        if let Some(token) = &user.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AppError::Eligibility(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Eligibility(e.to_string()))?;

        let body = resp
            .bytes()
            .await
            .map_err(|e| AppError::Eligibility(e.to_string()))?;

        parse_eligibility(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_is_used() {
        let body = br#"{"enrollment_eligibilities":[
            {"can_enroll":false,"person_id":7,"restrictions":[{"code":"in_the_past","description":"over"}]},
            {"can_enroll":true,"person_id":8,"restrictions":[]}
        ]}"#;
        let e = parse_eligibility(body).unwrap();
        assert!(!e.can_enroll);
        assert_eq!(e.restrictions[0].code, "in_the_past");
        assert_eq!(e.restrictions[0].description, "over");
    }

    #[test]
    fn missing_restrictions_mean_none() {
        let body = br#"{"enrollment_eligibilities":[{"can_enroll":true}]}"#;
        let e = parse_eligibility(body).unwrap();
        assert!(e.can_enroll);
        assert!(e.restrictions.is_empty());
    }

    #[test]
    fn empty_record_list_is_malformed() {
        let err = parse_eligibility(br#"{"enrollment_eligibilities":[]}"#).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        let err = parse_eligibility(b"{}").unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[test]
    fn undecodable_body_is_an_eligibility_error() {
        let err = parse_eligibility(b"<html>").unwrap_err();
        assert!(matches!(err, AppError::Eligibility(_)));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let c = FrontDeskClient::new("https://frontdesk.local/", Duration::from_secs(1)).unwrap();
        let url = c.eligibility_url(&EventId::parse("42").unwrap());
        assert_eq!(
            url,
            "https://frontdesk.local/api/v2/front/event_occurrences/42/enrollment_eligibilities"
        );
    }
}
