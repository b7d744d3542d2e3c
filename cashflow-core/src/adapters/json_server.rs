//! json-server REST client
//!
//! Talks to a json-server style backend exposing a `/transactions`
//! collection:
//!
//! - `GET /transactions?_sort=-createdAt&type=..&_page=..&_per_page=..`
//! - `GET /transactions/{id}`
//! - `POST /transactions`
//! - `PATCH /transactions/{id}`
//! - `DELETE /transactions/{id}`
//!
//! Listing responses come in several shapes depending on the json-server
//! version: a bare array, a `{ data, items, pages, .. }` object, or an array
//! with an `X-Total-Count` header. All of them are accepted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value as JsonValue;
use url::Url;

use crate::config::{Config, ListStrategy};
use crate::domain::query::DeletedScope;
use crate::domain::result::{Error, Result};
use crate::domain::{NewTransactionBody, Transaction, TransactionInput, TransactionPatch};
use crate::ports::{ListRequest, ListResponse, TransactionApi};

/// Default json-server address used by the web front-end
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Environment variable to override the backend base URL
pub const CASHFLOW_API_URL_ENV: &str = "CASHFLOW_API_URL";

/// Header json-server 0.x uses to report the unpaginated total
const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Get the backend base URL, checking the environment variable first
pub fn get_base_url() -> String {
    std::env::var(CASHFLOW_API_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// json-server HTTP client
#[derive(Debug, Clone)]
pub struct JsonServerClient {
    client: Client,
    base_url: String,
    collection: Url,
    timeout_secs: u64,
    paginate: bool,
}

impl JsonServerClient {
    /// Create a client for `base_url` that fetches full listings
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, 30, false)
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_options(
            &config.api_base_url,
            config.timeout_secs,
            config.list_strategy == ListStrategy::Server,
        )
    }

    /// Create a client with an explicit timeout and pagination mode
    pub fn with_options(base_url: &str, timeout_secs: u64, paginate: bool) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::Config("backend base URL cannot be empty".to_string()));
        }

        let collection = Url::parse(&format!("{}/transactions", base_url))
            .map_err(|e| Error::Config(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if collection.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Backend URL '{}' cannot hold a path",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            collection,
            timeout_secs,
            paginate,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> Url {
        self.collection.clone()
    }

    /// `/transactions/{id}` with the id encoded as a single path segment
    fn item_url(&self, id: &str) -> Result<Url> {
        if id == "." || id == ".." {
            return Err(Error::not_found(format!("transaction '{}'", id)));
        }
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!("Backend URL '{}' cannot hold a path", self.base_url))
            })?
            .push(id);
        Ok(url)
    }

    /// Query parameters for a listing request
    fn list_params(&self, request: &ListRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![("_sort", "-createdAt".to_string())];

        if let Some(kind) = request.kind {
            params.push(("type", kind.as_str().to_string()));
        }

        if self.paginate {
            match request.scope {
                Some(DeletedScope::ActiveOnly) => params.push(("deletedAt", "null".to_string())),
                Some(DeletedScope::OnlyDeleted) => {
                    params.push(("deletedAt:ne", "null".to_string()))
                }
                None => {}
            }
            if let Some(page) = request.page {
                params.push(("_page", page.page.to_string()));
                params.push(("_per_page", page.limit.to_string()));
                params.push(("_limit", page.limit.to_string()));
            }
        }

        params
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::network(format!(
                "Connection timed out after {} seconds",
                self.timeout_secs
            ))
        } else if error.is_connect() {
            Error::network(format!("Unable to connect to {}", self.base_url))
        } else if error.is_decode() {
            Error::Json(error.to_string())
        } else {
            Error::network(format!("Request failed: {}", error))
        }
    }

    /// Check response status and return appropriate errors
    async fn check_response_status(&self, response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            404 => Err(Error::not_found(what.to_string())),
            code => {
                let body = response.text().await.unwrap_or_default();
                let message = if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unexpected status").to_string()
                } else {
                    body
                };
                Err(Error::server(code, message))
            }
        }
    }
}

#[async_trait]
impl TransactionApi for JsonServerClient {
    fn name(&self) -> &str {
        "json-server"
    }

    fn can_paginate(&self) -> bool {
        self.paginate
    }

    async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        let response = self
            .client
            .get(self.collection_url())
            .query(&self.list_params(request))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response_status(response, "transactions").await?;

        let header_total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let mut parsed = parse_list_body(body)?;
        if parsed.total.is_none() {
            parsed.total = header_total;
        }
        Ok(parsed)
    }

    async fn get(&self, id: &str) -> Result<Transaction> {
        let response = self
            .client
            .get(self.item_url(id)?)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = self
            .check_response_status(response, &format!("transaction '{}'", id))
            .await?;

        response.json().await.map_err(|e| self.map_request_error(e))
    }

    async fn create(&self, input: &TransactionInput) -> Result<Transaction> {
        let body = NewTransactionBody::from(input);

        let response = self
            .client
            .post(self.collection_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response_status(response, "transactions").await?;

        response.json().await.map_err(|e| self.map_request_error(e))
    }

    async fn patch(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction> {
        let response = self
            .client
            .patch(self.item_url(id)?)
            .json(patch)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = self
            .check_response_status(response, &format!("transaction '{}'", id))
            .await?;

        response.json().await.map_err(|e| self.map_request_error(e))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.item_url(id)?)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(response, &format!("transaction '{}'", id))
            .await?;
        Ok(())
    }
}

/// Accept every listing shape json-server has used over the years
fn parse_list_body(body: JsonValue) -> Result<ListResponse> {
    match body {
        JsonValue::Array(_) => Ok(ListResponse {
            records: serde_json::from_value(body)?,
            total: None,
        }),
        JsonValue::Object(mut obj) => {
            let total = ["items", "total"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(JsonValue::as_u64));

            let records = match obj.remove("data") {
                Some(data @ JsonValue::Array(_)) => data,
                _ => match obj.remove("items") {
                    Some(items @ JsonValue::Array(_)) => items,
                    _ => {
                        return Err(Error::Json(
                            "listing response has no 'data' array".to_string(),
                        ))
                    }
                },
            };

            let records: Vec<Transaction> = serde_json::from_value(records)?;
            Ok(ListResponse { records, total })
        }
        _ => Err(Error::Json("unexpected listing response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Filter, ListQuery, TransactionType};

    fn record(id: &str) -> JsonValue {
        serde_json::json!({
            "id": id,
            "type": "income",
            "amount": 1000,
            "deletedAt": null,
            "createdAt": "2025-01-15T10:00:00.000Z",
            "updatedAt": "2025-01-15T10:00:00.000Z"
        })
    }

    #[test]
    fn test_reject_empty_base_url() {
        let result = JsonServerClient::new("  ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = JsonServerClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(
            client.item_url("abc").unwrap().as_str(),
            "http://localhost:3001/transactions/abc"
        );
    }

    #[test]
    fn test_item_url_encodes_id_as_one_segment() {
        let client = JsonServerClient::new("http://localhost:3001/api").unwrap();
        let url = |id: &str| client.item_url(id).unwrap().to_string();

        assert_eq!(url("a?x"), "http://localhost:3001/api/transactions/a%3Fx");
        assert_eq!(url("../x"), "http://localhost:3001/api/transactions/..%2Fx");
        assert_eq!(url("a b#c"), "http://localhost:3001/api/transactions/a%20b%23c");
        assert_eq!(url("42"), "http://localhost:3001/api/transactions/42");
        assert!(matches!(client.item_url(".."), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_reject_unparseable_base_url() {
        assert!(matches!(JsonServerClient::new("not a url"), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_base_url() {
        std::env::remove_var(CASHFLOW_API_URL_ENV);
        assert_eq!(get_base_url(), "http://localhost:3001");
    }

    #[test]
    fn test_list_params_client_strategy() {
        let client = JsonServerClient::new("http://localhost:3001").unwrap();
        let query = ListQuery::new(Filter::Income, 2, 10);

        let params = client.list_params(&ListRequest::paged(&query));
        assert_eq!(
            params,
            vec![("_sort", "-createdAt".to_string()), ("type", "income".to_string())]
        );
    }

    #[test]
    fn test_list_params_server_strategy() {
        let client = JsonServerClient::with_options("http://localhost:3001", 5, true).unwrap();
        let query = ListQuery::new(Filter::Deleted, 3, 15);

        let params = client.list_params(&ListRequest::paged(&query));
        assert!(params.contains(&("deletedAt:ne", "null".to_string())));
        assert!(params.contains(&("_page", "3".to_string())));
        assert!(params.contains(&("_per_page", "15".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "type"));
    }

    #[test]
    fn test_parse_bare_array() {
        let parsed = parse_list_body(serde_json::json!([record("a"), record("b")])).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.total, None);
    }

    #[test]
    fn test_parse_json_server_v1_page_object() {
        let body = serde_json::json!({
            "first": 1, "prev": null, "next": 2, "last": 3, "pages": 3, "items": 25,
            "data": [record("a")]
        });
        let parsed = parse_list_body(body).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.total, Some(25));
    }

    #[test]
    fn test_parse_items_total_object() {
        let body = serde_json::json!({ "items": [record("a"), record("b")], "total": 9 });
        let parsed = parse_list_body(body).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.total, Some(9));
        assert_eq!(parsed.records[0].kind, TransactionType::Income);
    }

    #[test]
    fn test_parse_rejects_unknown_shape() {
        assert!(parse_list_body(serde_json::json!({ "rows": [] })).is_err());
        assert!(parse_list_body(serde_json::json!("nope")).is_err());
    }
}
