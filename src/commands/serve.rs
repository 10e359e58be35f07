use crate::commands::build_dashboard;
use crate::models::DashboardConfig;
use crate::server;
use std::sync::Arc;

pub async fn run(port: Option<u16>) {
    let mut config = DashboardConfig::from_env();
    if let Some(port) = port {
        config.port = port;
    }

    println!("🚀 Starting sectorlens server on port {}", config.port);
    match &config.catalog_file {
        Some(path) => println!("📁 Sector catalog: {}", path.display()),
        None => println!("📁 Sector catalog: built-in"),
    }
    println!("📈 Benchmark: {} ({})", config.benchmark_label, config.benchmark_symbol);
    match config.cache_ttl() {
        Some(ttl) => println!("💾 Fetch cache TTL: {}s", ttl.as_secs()),
        None => println!("💾 Fetch cache TTL: until rate limit"),
    }

    let dashboard = match build_dashboard(&config) {
        Ok(dashboard) => Arc::new(dashboard),
        Err(e) => {
            eprintln!("❌ Failed to initialize dashboard: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "✅ Loaded {} sectors, {} tickers",
        dashboard.catalog().sector_count(),
        dashboard.catalog().ticker_count()
    );

    if let Err(e) = server::serve(dashboard, config.port).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
