use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookback period for price history requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    /// 5 days
    #[serde(rename = "5d")]
    Day5,
    /// 1 month
    #[serde(rename = "1mo")]
    Month1,
    /// 3 months
    #[serde(rename = "3mo")]
    Month3,
    /// 6 months
    #[serde(rename = "6mo")]
    Month6,
    /// 1 year
    #[serde(rename = "1y")]
    Year1,
    /// 3 years
    #[serde(rename = "3y")]
    Year3,
    /// 5 years
    #[serde(rename = "5y")]
    Year5,
    /// 10 years
    #[serde(rename = "10y")]
    Year10,
    /// 20 years
    #[serde(rename = "20y")]
    Year20,
}

impl Period {
    /// Provider range code ("5d", "1mo", ..., "20y")
    pub fn code(&self) -> &'static str {
        match self {
            Period::Day5 => "5d",
            Period::Month1 => "1mo",
            Period::Month3 => "3mo",
            Period::Month6 => "6mo",
            Period::Year1 => "1y",
            Period::Year3 => "3y",
            Period::Year5 => "5y",
            Period::Year10 => "10y",
            Period::Year20 => "20y",
        }
    }

    /// Human readable label used as chart titles
    pub fn label(&self) -> &'static str {
        match self {
            Period::Day5 => "5 days",
            Period::Month1 => "1 month",
            Period::Month3 => "3 months",
            Period::Month6 => "6 months",
            Period::Year1 => "1 year",
            Period::Year3 => "3 years",
            Period::Year5 => "5 years",
            Period::Year10 => "10 years",
            Period::Year20 => "20 years",
        }
    }

    /// Parse from provider code (case-insensitive)
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "5d" => Ok(Period::Day5),
            "1mo" => Ok(Period::Month1),
            "3mo" => Ok(Period::Month3),
            "6mo" => Ok(Period::Month6),
            "1y" => Ok(Period::Year1),
            "3y" => Ok(Period::Year3),
            "5y" => Ok(Period::Year5),
            "10y" => Ok(Period::Year10),
            "20y" => Ok(Period::Year20),
            _ => Err(format!(
                "Invalid period: '{}'. Valid values: 5d, 1mo, 3mo, 6mo, 1y, 3y, 5y, 10y, 20y",
                s
            )),
        }
    }

    /// All selectable periods, shortest first
    pub fn all() -> Vec<Period> {
        vec![
            Period::Day5,
            Period::Month1,
            Period::Month3,
            Period::Month6,
            Period::Year1,
            Period::Year3,
            Period::Year5,
            Period::Year10,
            Period::Year20,
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::from_str(s)
    }
}

impl Default for Period {
    fn default() -> Self {
        crate::constants::DEFAULT_CHART_PERIOD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_default() {
        assert_eq!(Period::default(), Period::Year5);
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!(Period::from_str("5d").unwrap(), Period::Day5);
        assert_eq!(Period::from_str("1MO").unwrap(), Period::Month1);
        assert_eq!(Period::from_str(" 10y ").unwrap(), Period::Year10);
        assert!(Period::from_str("2y").is_err());
        assert!(Period::from_str("").is_err());
    }

    #[test]
    fn test_period_codes_parse_back() {
        for period in Period::all() {
            assert_eq!(Period::from_str(period.code()).unwrap(), period);
        }
    }

    #[test]
    fn test_period_serde() {
        let json = serde_json::to_string(&Period::Month3).unwrap();
        assert_eq!(json, r#""3mo""#);

        let period: Period = serde_json::from_str(r#""20y""#).unwrap();
        assert_eq!(period, Period::Year20);
    }
}
