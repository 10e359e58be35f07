use chrono::{DateTime, Utc};

/// API request performance metrics
#[derive(Debug, Clone)]
pub struct ApiPerformanceMetrics {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: ApiStatus,
    pub endpoint: String,
    pub sector: String,
    pub ticker_count: usize,
    pub period: String,
    pub response_format: String,
    pub response_size_bytes: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Success,
    Fail,
}

impl ApiPerformanceMetrics {
    pub fn new(endpoint: &str, start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: start_time,
            duration_ms: 0,
            status: ApiStatus::Success,
            endpoint: endpoint.to_string(),
            sector: String::new(),
            ticker_count: 0,
            period: String::new(),
            response_format: "json".to_string(),
            response_size_bytes: 0,
            error_message: None,
        }
    }

    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.status = ApiStatus::Fail;
        self.error_message = Some(error.to_string());
    }

    pub fn complete(&mut self) {
        self.complete_at(Utc::now());
    }

    pub fn complete_at(&mut self, end_time: DateTime<Utc>) {
        self.end_time = end_time;
        self.duration_ms = (self.end_time - self.start_time).num_milliseconds().max(0) as u64;
    }

    /// Compact one-line summary of the request
    pub fn summary(&self) -> String {
        let status_str = match self.status {
            ApiStatus::Success => "OK",
            ApiStatus::Fail => "FAIL",
        };

        let duration_str = if self.duration_ms >= 1000 {
            format!("{}.{:01}s", self.duration_ms / 1000, (self.duration_ms % 1000) / 100)
        } else {
            format!("{}ms", self.duration_ms)
        };

        let response_size_str = if self.response_size_bytes >= 1024 {
            format!("{}kb", self.response_size_bytes / 1024)
        } else {
            format!("{}b", self.response_size_bytes)
        };

        let error_info = match self.error_message {
            Some(ref error) => format!(" error:{}", error),
            None => String::new(),
        };

        format!(
            "{} | {} | {} | sector:{} tickers:{} period:{} format:{} size:{}{}",
            self.endpoint,
            status_str,
            duration_str,
            self.sector,
            self.ticker_count,
            self.period,
            self.response_format,
            response_size_str,
            error_info
        )
    }
}

/// Emit the request summary through tracing
pub fn log_api_request(metrics: &ApiPerformanceMetrics) {
    match metrics.status {
        ApiStatus::Success => tracing::info!(target: "api", "{}", metrics.summary()),
        ApiStatus::Fail => tracing::warn!(target: "api", "{}", metrics.summary()),
    }
}
