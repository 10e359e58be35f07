use crate::models::{DashboardConfig, SectorCatalog};

pub fn run() {
    let config = DashboardConfig::from_env();

    let catalog = match SectorCatalog::load(config.catalog_file.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("📊 Sector Catalog\n");
    for line in render(&catalog) {
        println!("{}", line);
    }
    println!(
        "\n💡 {} sectors, {} tickers. Benchmark: {}",
        catalog.sector_count(),
        catalog.ticker_count(),
        config.benchmark_label
    );
}

fn render(catalog: &SectorCatalog) -> Vec<String> {
    let mut lines = Vec::new();
    for sector in &catalog.sectors {
        lines.push(format!("🔹 {} ({} tickers)", sector.name, sector.tickers.len()));
        for ticker in &sector.tickers {
            lines.push(format!("   {:<8} {}", ticker.symbol, ticker.name));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_every_ticker() {
        let catalog = SectorCatalog::builtin();
        let lines = render(&catalog);
        assert_eq!(lines.len(), catalog.sector_count() + catalog.sectors.iter().map(|s| s.tickers.len()).sum::<usize>());
        assert!(lines.iter().any(|l| l.contains("9432.T") && l.contains("9432 NTT")));
    }
}
