use std::path::PathBuf;

use crate::constants::{
    DEFAULT_BENCHMARK_LABEL, DEFAULT_BENCHMARK_SYMBOL, DEFAULT_CACHE_TTL_SECS, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_PER_MINUTE, DEFAULT_YAHOO_BASE_URL,
};

/// Get sector catalog file from environment variable (None = built-in catalog)
pub fn get_sector_catalog_file() -> Option<PathBuf> {
    std::env::var("SECTOR_CATALOG_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Get benchmark index symbol from environment variable or use default
pub fn get_benchmark_symbol() -> String {
    std::env::var("BENCHMARK_SYMBOL").unwrap_or_else(|_| DEFAULT_BENCHMARK_SYMBOL.to_string())
}

/// Get benchmark display label from environment variable or use default
pub fn get_benchmark_label() -> String {
    std::env::var("BENCHMARK_LABEL").unwrap_or_else(|_| DEFAULT_BENCHMARK_LABEL.to_string())
}

/// Get Yahoo Finance base URL from environment variable or use default
pub fn get_yahoo_base_url() -> String {
    std::env::var("YAHOO_BASE_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| DEFAULT_YAHOO_BASE_URL.to_string())
}

/// Get provider rate limit (requests per minute)
pub fn get_rate_limit_per_minute() -> u32 {
    parse_env_or("YAHOO_RATE_LIMIT_PER_MINUTE", DEFAULT_RATE_LIMIT_PER_MINUTE)
}

/// Get fetch cache TTL in seconds
pub fn get_cache_ttl_secs() -> u64 {
    parse_env_or("FETCH_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)
}

/// Get server port
pub fn get_port() -> u16 {
    parse_env_or("SECTORLENS_PORT", DEFAULT_PORT)
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Format a number with thousands separators and a fixed number of decimals
pub fn format_with_separators(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
