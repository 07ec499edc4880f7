use serde::{Deserialize, Serialize};
use std::fmt;

/// Intraday bar resolutions the market-data provider can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "60m")]
    H1,
}

impl Timeframe {
    /// Also the `interval` parameter of the Yahoo chart API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M2 => "2m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "60m",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Timeframe> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Some(Timeframe::M1),
            "2m" => Some(Timeframe::M2),
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "30m" => Some(Timeframe::M30),
            "60m" | "1h" => Some(Timeframe::H1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_names() {
        assert_eq!(Timeframe::from_str_loose("5m"), Some(Timeframe::M5));
        assert_eq!(Timeframe::from_str_loose(" 1H "), Some(Timeframe::H1));
        assert_eq!(Timeframe::from_str_loose("1d"), None);
    }

    #[test]
    fn displays_as_yahoo_interval() {
        assert_eq!(Timeframe::M5.to_string(), "5m");
        assert_eq!(Timeframe::H1.to_string(), "60m");
    }
}
