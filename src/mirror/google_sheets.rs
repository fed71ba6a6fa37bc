//! Google Sheets v4 values API client.
//!
//! Only three calls are needed: read one column, overwrite one row, append
//! one row. Authentication is an OAuth bearer token supplied by
//! configuration.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use super::MirrorSheet;
use super::row::{FIRST_COLUMN, LAST_COLUMN, cell_text};
use crate::config::SheetsConfig;
use crate::error::MirrorError;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct GoogleSheetsMirror {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    worksheet: String,
    access_token: SecretString,
}

impl GoogleSheetsMirror {
    pub fn new(config: SheetsConfig) -> Result<Self, MirrorError> {
        Self::with_base_url(config, SHEETS_API_BASE)
    }

    /// Point the client at a different API root (local test servers).
    pub fn with_base_url(config: SheetsConfig, base_url: &str) -> Result<Self, MirrorError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MirrorError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id,
            worksheet: config.worksheet,
            access_token: config.access_token,
        })
    }

    /// `worksheet!range`, quoting the worksheet name when needed.
    fn a1(&self, range: &str) -> String {
        format!("{}!{range}", quote_sheet_name(&self.worksheet))
    }

    fn values_url(&self, range: &str) -> Result<reqwest::Url, MirrorError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| MirrorError::Unavailable(format!("invalid API base URL: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| MirrorError::Unavailable("API base URL cannot carry a path".into()))?;
            segments
                .pop_if_empty()
                .push(&self.spreadsheet_id)
                .push("values")
                .push(range);
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, MirrorError> {
        let resp = request
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MirrorError::Timeout(REQUEST_TIMEOUT)
                } else {
                    MirrorError::Http(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(MirrorError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MirrorSheet for GoogleSheetsMirror {
    async fn column_values(&self, column: char) -> Result<Vec<String>, MirrorError> {
        let url = self.values_url(&self.a1(&format!("{column}:{column}")))?;
        let resp = self.send(self.client.get(url)).await?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| MirrorError::InvalidResponse(e.to_string()))?;
        parse_column_values(&body)
    }

    async fn update_row(&self, row: usize, values: &[Value]) -> Result<(), MirrorError> {
        let range = self.a1(&format!("{FIRST_COLUMN}{row}:{LAST_COLUMN}{row}"));
        let url = self.values_url(&range)?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });

        self.send(
            self.client
                .put(url)
                .query(&[("valueInputOption", "RAW")])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn append_row(&self, values: &[Value]) -> Result<(), MirrorError> {
        let range = self.a1(&format!("{FIRST_COLUMN}:{LAST_COLUMN}"));
        let url = self.values_url(&format!("{range}:append"))?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });

        self.send(
            self.client
                .post(url)
                .query(&[
                    ("valueInputOption", "RAW"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&body),
        )
        .await?;
        Ok(())
    }
}

/// Worksheet names with anything but letters, digits and `_` must be
/// single-quoted in A1 notation, with embedded quotes doubled.
fn quote_sheet_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Flatten a single-column `ValueRange` into one string per row.
///
/// The API omits trailing empty rows and sends interior empty rows as `[]`.
fn parse_column_values(body: &Value) -> Result<Vec<String>, MirrorError> {
    let Some(values) = body.get("values") else {
        // An empty column comes back without a `values` key.
        return Ok(Vec::new());
    };
    let rows = values
        .as_array()
        .ok_or_else(|| MirrorError::InvalidResponse("`values` is not an array".into()))?;

    Ok(rows
        .iter()
        .map(|row| {
            row.as_array()
                .and_then(|cells| cells.first())
                .map(cell_text)
                .unwrap_or_default()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::Router;
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::get;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: &'static str,
        range: String,
        auth: Option<String>,
        body: Option<Value>,
    }

    #[derive(Clone, Default)]
    struct FakeSheets {
        column: Arc<Vec<Value>>,
        requests: Arc<Mutex<Vec<Recorded>>>,
    }

    fn auth(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    async fn read_values(
        State(fake): State<FakeSheets>,
        Path((_id, range)): Path<(String, String)>,
        headers: HeaderMap,
    ) -> axum::Json<Value> {
        fake.requests.lock().await.push(Recorded {
            method: "GET",
            range: range.clone(),
            auth: auth(&headers),
            body: None,
        });
        axum::Json(json!({ "range": range, "values": fake.column.as_ref() }))
    }

    async fn write_values(
        State(fake): State<FakeSheets>,
        Path((_id, range)): Path<(String, String)>,
        headers: HeaderMap,
        axum::Json(body): axum::Json<Value>,
    ) -> axum::Json<Value> {
        fake.requests.lock().await.push(Recorded {
            method: "PUT",
            range,
            auth: auth(&headers),
            body: Some(body),
        });
        axum::Json(json!({}))
    }

    async fn append_values(
        State(fake): State<FakeSheets>,
        Path((_id, range)): Path<(String, String)>,
        headers: HeaderMap,
        axum::Json(body): axum::Json<Value>,
    ) -> axum::Json<Value> {
        fake.requests.lock().await.push(Recorded {
            method: "POST",
            range,
            auth: auth(&headers),
            body: Some(body),
        });
        axum::Json(json!({}))
    }

    async fn serve(fake: FakeSheets) -> String {
        let app = Router::new()
            .route(
                "/v4/spreadsheets/{id}/values/{range}",
                get(read_values).put(write_values).post(append_values),
            )
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v4/spreadsheets")
    }

    fn config(worksheet: &str) -> SheetsConfig {
        SheetsConfig {
            spreadsheet_id: "sheet-123".into(),
            access_token: SecretString::from("ya29.test-token"),
            worksheet: worksheet.into(),
        }
    }

    #[test]
    fn sheet_names_are_quoted_when_needed() {
        assert_eq!(quote_sheet_name("main"), "main");
        assert_eq!(quote_sheet_name("Лист_1"), "Лист_1");
        assert_eq!(quote_sheet_name("My Sheet"), "'My Sheet'");
        assert_eq!(quote_sheet_name("Anna's"), "'Anna''s'");
    }

    #[test]
    fn column_values_tolerate_gaps() {
        let body = json!({
            "range": "main!B1:B4",
            "values": [["Telegram ID"], [], [123456789], ["42"]]
        });
        assert_eq!(
            parse_column_values(&body).unwrap(),
            vec!["Telegram ID", "", "123456789", "42"]
        );
        assert!(parse_column_values(&json!({"range": "main!B:B"})).unwrap().is_empty());
        assert!(parse_column_values(&json!({"values": "nope"})).is_err());
    }

    #[tokio::test]
    async fn reads_column_with_bearer_token() {
        let fake = FakeSheets {
            column: Arc::new(vec![json!(["Telegram ID"]), json!(["777"])]),
            ..Default::default()
        };
        let base = serve(fake.clone()).await;
        let mirror = GoogleSheetsMirror::with_base_url(config("main"), &base).unwrap();

        let values = mirror.column_values('B').await.unwrap();
        assert_eq!(values, vec!["Telegram ID", "777"]);

        let requests = fake.requests.lock().await;
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].range, "main!B:B");
        assert_eq!(requests[0].auth.as_deref(), Some("Bearer ya29.test-token"));
    }

    #[tokio::test]
    async fn update_and_append_target_expected_ranges() {
        let fake = FakeSheets::default();
        let base = serve(fake.clone()).await;
        let mirror = GoogleSheetsMirror::with_base_url(config("main"), &base).unwrap();

        mirror
            .update_row(5, &[json!(1), json!(777)])
            .await
            .unwrap();
        mirror.append_row(&[json!(2), json!(888)]).await.unwrap();

        let requests = fake.requests.lock().await;
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].range, "main!A5:L5");
        assert_eq!(
            requests[0].body.as_ref().unwrap()["values"],
            json!([[1, 777]])
        );
        assert_eq!(requests[1].method, "POST");
        assert_eq!(requests[1].range, "main!A:L:append");
    }

    #[tokio::test]
    async fn api_errors_carry_status() {
        let app = Router::new().route(
            "/v4/spreadsheets/{id}/values/{range}",
            get(|| async { (axum::http::StatusCode::FORBIDDEN, "denied") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mirror = GoogleSheetsMirror::with_base_url(
            config("main"),
            &format!("http://{addr}/v4/spreadsheets"),
        )
        .unwrap();
        match mirror.column_values('B').await {
            Err(MirrorError::Api { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "denied");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
