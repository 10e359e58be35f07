use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SectorCatalog;

/// The user's current sector and ticker choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub sector: String,
    pub tickers: Vec<String>,
}

impl Selection {
    /// Resolve a selection against the catalog.
    ///
    /// `prior` is the last selection the caller saw. When it is absent or
    /// belongs to another sector, the tickers reset to the sector's full
    /// default set and `requested` is ignored. Otherwise `requested` wins,
    /// falling back to the prior tickers.
    pub fn resolve(
        catalog: &SectorCatalog,
        sector_name: &str,
        requested: Option<&[String]>,
        prior: Option<&Selection>,
    ) -> Result<Selection> {
        let sector = catalog
            .get(sector_name)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown sector: '{}'", sector_name)))?;

        let Some(prior) = prior.filter(|p| p.sector == sector.name) else {
            tracing::debug!("Sector changed to {}, restoring default tickers", sector.name);
            return Ok(Selection {
                sector: sector.name.clone(),
                tickers: sector.symbols(),
            });
        };

        let candidates: Vec<String> = match requested {
            Some(requested) => requested.to_vec(),
            None => prior.tickers.clone(),
        };

        let mut tickers: Vec<String> = Vec::with_capacity(candidates.len());
        for raw in candidates {
            let ticker = raw.trim().to_uppercase();
            if ticker.is_empty() || tickers.contains(&ticker) {
                continue;
            }
            if !sector.contains(&ticker) {
                return Err(AppError::InvalidInput(format!(
                    "Ticker '{}' is not part of sector '{}'",
                    ticker, sector.name
                )));
            }
            tickers.push(ticker);
        }

        Ok(Selection {
            sector: sector.name.clone(),
            tickers,
        })
    }

    /// Selection for a stateless request: explicit tickers or the sector default
    pub fn for_request(
        catalog: &SectorCatalog,
        sector_name: &str,
        requested: Option<&[String]>,
    ) -> Result<Selection> {
        let prior = requested.map(|tickers| Selection {
            sector: sector_name.to_string(),
            tickers: tickers.to_vec(),
        });
        Self::resolve(catalog, sector_name, requested, prior.as_ref())
    }

    /// Nothing selected: prompt the user instead of rendering
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Peer comparison needs at least two tickers
    pub fn supports_peer_comparison(&self) -> bool {
        self.tickers.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SectorCatalog {
        SectorCatalog::builtin()
    }

    #[test]
    fn test_no_prior_restores_defaults() {
        let selection = Selection::resolve(&catalog(), "通信", None, None).unwrap();
        assert_eq!(selection.tickers, vec!["9432.T", "9433.T", "9434.T", "9435.T"]);
    }

    #[test]
    fn test_sector_change_resets_to_defaults() {
        let prior = Selection {
            sector: "通信".to_string(),
            tickers: vec!["9432.T".to_string()],
        };
        let requested = vec!["9432.T".to_string()];

        let selection =
            Selection::resolve(&catalog(), "住宅", Some(&requested), Some(&prior)).unwrap();

        assert_eq!(selection.sector, "住宅");
        assert_eq!(selection.tickers, vec!["1928.T", "1925.T", "1926.T", "1963.T"]);
    }

    #[test]
    fn test_same_sector_keeps_prior_tickers() {
        let prior = Selection {
            sector: "通信".to_string(),
            tickers: vec!["9433.T".to_string(), "9434.T".to_string()],
        };

        let selection = Selection::resolve(&catalog(), "通信", None, Some(&prior)).unwrap();
        assert_eq!(selection.tickers, vec!["9433.T", "9434.T"]);
    }

    #[test]
    fn test_requested_tickers_are_normalized() {
        let requested = vec!["9433.t".to_string(), " 9433.T".to_string(), "9432.T".to_string()];
        let selection = Selection::for_request(&catalog(), "通信", Some(&requested)).unwrap();
        assert_eq!(selection.tickers, vec!["9433.T", "9432.T"]);
    }

    #[test]
    fn test_unknown_sector_rejected() {
        let err = Selection::resolve(&catalog(), "nope", None, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_ticker_outside_sector_rejected() {
        let requested = vec!["7203.T".to_string()];
        assert!(Selection::for_request(&catalog(), "通信", Some(&requested)).is_err());
    }

    #[test]
    fn test_empty_selection_is_not_an_error() {
        let requested: Vec<String> = vec![];
        let selection = Selection::for_request(&catalog(), "通信", Some(&requested)).unwrap();
        assert!(selection.is_empty());
        assert!(!selection.supports_peer_comparison());
    }
}
