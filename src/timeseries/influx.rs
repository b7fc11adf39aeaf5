use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use super::errors::TimeSeriesError;
use super::point::Point;
use super::query::{SeriesQuery, SeriesRecord};
use super::store::TimeSeriesStore;
use super::TimeSeriesConfig;

/// InfluxDB v2 over its HTTP API: line-protocol writes, Flux queries answered as CSV
pub struct InfluxStore {
    client: reqwest::Client,
    url: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxStore {
    pub fn new(config: &TimeSeriesConfig) -> Result<Self, TimeSeriesError> {
        if config.bucket.is_empty() || config.org.is_empty() {
            return Err(TimeSeriesError::Config("InfluxDB org and bucket are required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| TimeSeriesError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            token: config.token.clone(),
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TimeSeriesError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
        Err(TimeSeriesError::Status(status, text))
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxStore {
    async fn write(&self, point: &Point) -> Result<(), TimeSeriesError> {
        let response = self
            .client
            .post(format!("{}/api/v2/write", self.url))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ms"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(point.to_line_protocol())
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn query(&self, query: &SeriesQuery) -> Result<Vec<SeriesRecord>, TimeSeriesError> {
        let flux = query.to_flux(&self.bucket);
        debug!("Running Flux query:\n{}", flux);

        let response = self
            .client
            .post(format!("{}/api/v2/query", self.url))
            .query(&[("org", self.org.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/csv")
            .json(&json!({
                "query": flux,
                "type": "flux",
                "dialect": {
                    "header": true,
                    "annotations": [],
                    "delimiter": ","
                }
            }))
            .send()
            .await?;

        let body = Self::check_status(response).await?.text().await?;
        parse_flux_csv(&body)
    }
}

/// Parse an unannotated Flux CSV response.
///
/// Each result table restates its header row; rows with an empty `_value`
/// are skipped.
pub fn parse_flux_csv(body: &str) -> Result<Vec<SeriesRecord>, TimeSeriesError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    struct Columns {
        time: usize,
        value: usize,
        field: Option<usize>,
    }

    let mut columns: Option<Columns> = None;
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }

        let position = |name: &str| row.iter().position(|cell| cell == name);
        if let (Some(time), Some(value)) = (position("_time"), position("_value")) {
            columns = Some(Columns {
                time,
                value,
                field: position("_field"),
            });
            continue;
        }

        let Some(cols) = columns.as_ref() else {
            return Err(TimeSeriesError::Parse("data row before header row".to_string()));
        };

        let raw_value = row.get(cols.value).unwrap_or_default();
        if raw_value.is_empty() {
            continue;
        }

        let raw_time = row.get(cols.time).unwrap_or_default();
        let time = DateTime::parse_from_rfc3339(raw_time)
            .map_err(|e| TimeSeriesError::Parse(format!("invalid _time {:?}: {}", raw_time, e)))?
            .with_timezone(&Utc);
        let value = raw_value
            .parse::<f64>()
            .map_err(|e| TimeSeriesError::Parse(format!("invalid _value {:?}: {}", raw_value, e)))?;
        let field = cols
            .field
            .and_then(|idx| row.get(idx))
            .unwrap_or_default()
            .to_string();

        records.push(SeriesRecord { time, field, value });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_multiple_tables() {
        let body = "\
,result,table,_start,_stop,_time,_value,_field,_measurement\r\n\
,_result,0,2024-05-01T00:00:00Z,2024-05-01T08:00:00Z,2024-05-01T00:00:00Z,120.5,rpc_time,transactions\r\n\
,_result,0,2024-05-01T00:00:00Z,2024-05-01T08:00:00Z,2024-05-01T00:30:00Z,,rpc_time,transactions\r\n\
\r\n\
,result,table,_start,_stop,_time,_value,_field,_measurement\r\n\
,_result,1,2024-05-01T00:00:00Z,2024-05-01T08:00:00Z,2024-05-01T00:00:00Z,410,solana_time,transactions\r\n";

        let records = parse_flux_csv(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field, "rpc_time");
        assert_eq!(records[0].value, 120.5);
        assert_eq!(records[0].time, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(records[1].field, "solana_time");
        assert_eq!(records[1].value, 410.0);
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_flux_csv("").unwrap().is_empty());
        assert!(parse_flux_csv("\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let body = ",result,table,_time,_value,_field\n,_result,0,2024-05-01T00:00:00Z,abc,rpc_time\n";
        assert!(matches!(parse_flux_csv(body), Err(TimeSeriesError::Parse(_))));

        let body = ",result,table,_time,_value,_field\n,_result,0,yesterday,1,rpc_time\n";
        assert!(matches!(parse_flux_csv(body), Err(TimeSeriesError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_headerless_rows() {
        let body = ",_result,0,2024-05-01T00:00:00Z,1,rpc_time\n";
        assert!(matches!(parse_flux_csv(body), Err(TimeSeriesError::Parse(_))));
    }

    #[test]
    fn test_store_requires_bucket() {
        let config = TimeSeriesConfig {
            bucket: String::new(),
            ..TimeSeriesConfig::default()
        };
        assert!(matches!(InfluxStore::new(&config), Err(TimeSeriesError::Config(_))));
    }
}
