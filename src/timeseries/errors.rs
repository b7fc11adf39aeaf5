use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeSeriesError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Time-series store returned {0}: {1}")]
    Status(reqwest::StatusCode, String),

    #[error("Failed to read query result CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse query result: {0}")]
    Parse(String),

    #[error("Time-series configuration error: {0}")]
    Config(String),
}
