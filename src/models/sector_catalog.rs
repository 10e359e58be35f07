use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};

/// A listed company inside a sector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEntry {
    /// Exchange-qualified symbol, e.g. "7203.T"
    pub symbol: String,
    /// Display name, e.g. "7203 トヨタ自動車"
    pub name: String,
}

/// Named group of tickers, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub name: String,
    pub tickers: Vec<TickerEntry>,
}

impl Sector {
    /// Symbols in catalog order; this is the default selection for the sector
    pub fn symbols(&self) -> Vec<String> {
        self.tickers.iter().map(|t| t.symbol.clone()).collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.tickers.iter().any(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn display_name(&self, symbol: &str) -> Option<&str> {
        self.tickers
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .map(|t| t.name.as_str())
    }
}

/// Static sector catalog: sector name -> ordered (ticker, display name)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorCatalog {
    pub sectors: Vec<Sector>,
}

impl SectorCatalog {
    /// Build a catalog, rejecting duplicate sector names and empty sectors
    pub fn new(sectors: Vec<Sector>) -> Result<Self> {
        let mut seen = HashSet::new();
        for sector in &sectors {
            if !seen.insert(sector.name.as_str()) {
                return Err(AppError::Config(format!("Duplicate sector '{}'", sector.name)));
            }
            if sector.tickers.is_empty() {
                return Err(AppError::Config(format!("Sector '{}' has no tickers", sector.name)));
            }
        }
        Ok(Self { sectors })
    }

    /// Load catalog from a JSON file (array of {name, tickers: [{symbol, name}]})
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let sectors: Vec<Sector> = serde_json::from_str(&content)?;
        Self::new(sectors)
    }

    /// Load the configured catalog file, or the built-in catalog when none is set
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::info!("Loading sector catalog from {}", path.display());
                Self::from_file(path)
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, sector_name: &str) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.name == sector_name)
    }

    /// Sector names in catalog order
    pub fn sector_names(&self) -> Vec<String> {
        self.sectors.iter().map(|s| s.name.clone()).collect()
    }

    /// Look up a display name across all sectors
    pub fn display_name(&self, symbol: &str) -> Option<&str> {
        self.sectors.iter().find_map(|s| s.display_name(symbol))
    }

    /// Display name for a symbol, falling back to the symbol itself
    pub fn display_name_or_symbol(&self, symbol: &str) -> String {
        self.display_name(symbol)
            .map(str::to_string)
            .unwrap_or_else(|| symbol.to_string())
    }

    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn ticker_count(&self) -> usize {
        let mut tickers: Vec<&str> = self
            .sectors
            .iter()
            .flat_map(|s| s.tickers.iter().map(|t| t.symbol.as_str()))
            .collect();
        tickers.sort_unstable();
        tickers.dedup();
        tickers.len()
    }

    /// Built-in catalog of Tokyo Stock Exchange sectors
    pub fn builtin() -> Self {
        let sector = |name: &str, tickers: &[(&str, &str)]| Sector {
            name: name.to_string(),
            tickers: tickers
                .iter()
                .map(|(symbol, display)| TickerEntry {
                    symbol: symbol.to_string(),
                    name: display.to_string(),
                })
                .collect(),
        };

        Self {
            sectors: vec![
                sector(
                    "エネルギー",
                    &[
                        ("1605.T", "1605 INPEX"),
                        ("1662.T", "1662 JAPEX"),
                        ("5020.T", "5020 ENEOS"),
                        ("5019.T", "5019 出光興産"),
                        ("5021.T", "5021 コスモエネルギー"),
                    ],
                ),
                sector(
                    "商社",
                    &[
                        ("8001.T", "8001 伊藤忠商事"),
                        ("8002.T", "8002 丸紅"),
                        ("8015.T", "8015 豊田通商"),
                        ("8031.T", "8031 三井物産"),
                        ("8053.T", "8053 住友商事"),
                        ("8058.T", "8058 三菱商事"),
                    ],
                ),
                sector(
                    "通信",
                    &[
                        ("9432.T", "9432 NTT"),
                        ("9433.T", "9433 KDDI"),
                        ("9434.T", "9434 ソフトバンク"),
                        ("9435.T", "9435 光通信"),
                    ],
                ),
                sector(
                    "電気製品",
                    &[
                        ("6503.T", "6503 三菱電機"),
                        ("6758.T", "6758 ソニーG"),
                        ("6752.T", "6752 パナソニックHD"),
                        ("6701.T", "6701 NEC"),
                        ("6702.T", "6702 富士通"),
                    ],
                ),
                sector(
                    "自動車",
                    &[
                        ("7201.T", "7201 日産自動車"),
                        ("7202.T", "7202 いすゞ自動車"),
                        ("7203.T", "7203 トヨタ自動車"),
                        ("7267.T", "7267 ホンダ"),
                        ("7269.T", "7269 スズキ"),
                        ("7270.T", "7270 SUBARU"),
                    ],
                ),
                sector(
                    "銀行",
                    &[
                        ("5838.T", "5838 楽天銀行"),
                        ("7182.T", "7182 ゆうちょ銀行"),
                        ("8306.T", "8306 三菱UFJ FG"),
                        ("8316.T", "8316 三井住友 FG"),
                        ("8411.T", "8411 みずほ FG"),
                        ("8309.T", "8309 三井住友トラストHD"),
                        ("8410.T", "8410 セブン銀行"),
                    ],
                ),
                sector(
                    "化学",
                    &[
                        ("3402.T", "3402 東レ"),
                        ("3407.T", "3407 旭化成"),
                        ("4004.T", "4004 昭和電工"),
                        ("4005.T", "4005 住友化学"),
                        ("4063.T", "4063 信越化学工業"),
                        ("4188.T", "4188 三菱ケミカルG"),
                        ("4208.T", "4208 ＵＢＥ"),
                        ("5201.T", "5201 ＡＧＣ"),
                    ],
                ),
                sector(
                    "医薬品",
                    &[
                        ("4502.T", "4502 武田薬品工業"),
                        ("4503.T", "4503 アステラス製薬"),
                        ("4519.T", "4519 中外製薬"),
                        ("4543.T", "4543 テルモ"),
                        ("4568.T", "4568 第一三共"),
                    ],
                ),
                sector(
                    "流通",
                    &[
                        ("3382.T", "3382 セブン&アイ"),
                        ("3391.T", "3391 ツルハＨＤ"),
                        ("7453.T", "7453 良品計画"),
                        ("8267.T", "8267 イオン"),
                        ("9843.T", "9843 ニトリ"),
                    ],
                ),
                sector(
                    "住宅",
                    &[
                        ("1928.T", "1928 積水ハウス"),
                        ("1925.T", "1925 大和ハウス工業"),
                        ("1926.T", "1926 ライト工業"),
                        ("1963.T", "1963 日揮HD"),
                    ],
                ),
                sector(
                    "建設",
                    &[
                        ("1802.T", "1802 大林組"),
                        ("1803.T", "1803 清水建設"),
                        ("1801.T", "1801 大成建設"),
                        ("1812.T", "1812 鹿島建設"),
                        ("1821.T", "1821 三井住友建設"),
                    ],
                ),
            ],
        }
    }
}
