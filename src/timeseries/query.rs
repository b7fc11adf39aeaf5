use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Per-window reduction applied by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Mean,
    Count,
    Sum,
}

impl Aggregate {
    fn flux_fn(&self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
        }
    }
}

/// A filtered range query over one measurement.
///
/// With an aggregate, results carry one row per (field, window) with the
/// window start as timestamp; windows align to the Unix epoch and empty
/// windows are omitted. Without one, raw samples are returned.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub measurement: String,
    pub fields: Vec<String>,
    pub tags: Vec<(String, String)>,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub window: Duration,
    pub aggregate: Option<Aggregate>,
}

/// One row of a query result
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord {
    pub time: DateTime<Utc>,
    pub field: String,
    pub value: f64,
}

impl SeriesQuery {
    pub fn new(measurement: impl Into<String>, start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            fields: Vec::new(),
            tags: Vec::new(),
            start,
            stop,
            window: Duration::minutes(30),
            aggregate: None,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    /// Render as a Flux script against `bucket`
    pub fn to_flux(&self, bucket: &str) -> String {
        let mut lines = vec![
            format!("from(bucket: \"{}\")", flux_string(bucket)),
            format!(
                "  |> range(start: {}, stop: {})",
                self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
                self.stop.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            format!(
                "  |> filter(fn: (r) => r._measurement == \"{}\")",
                flux_string(&self.measurement)
            ),
        ];

        if !self.fields.is_empty() {
            let predicate = self
                .fields
                .iter()
                .map(|f| format!("r._field == \"{}\"", flux_string(f)))
                .collect::<Vec<_>>()
                .join(" or ");
            lines.push(format!("  |> filter(fn: (r) => {})", predicate));
        }

        for (key, value) in &self.tags {
            lines.push(format!(
                "  |> filter(fn: (r) => r[\"{}\"] == \"{}\")",
                flux_string(key),
                flux_string(value)
            ));
        }

        lines.push("  |> group(columns: [\"_field\"])".to_string());

        if let Some(aggregate) = self.aggregate {
            lines.push(format!(
                "  |> aggregateWindow(every: {}s, fn: {}, timeSrc: \"_start\", createEmpty: false)",
                self.window.num_seconds(),
                aggregate.flux_fn()
            ));
        }

        lines.join("\n")
    }
}

fn flux_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
