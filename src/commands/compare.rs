use crate::commands::{build_dashboard, requested};
use crate::dashboard::{ComparisonGrid, GridCell, ReturnChart, SectionOutcome};
use crate::models::{DashboardConfig, Period, Selection};

pub async fn run(sector: String, tickers: Vec<String>, period: String) {
    let period = match Period::from_str(&period) {
        Ok(period) => period,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let config = DashboardConfig::from_env();
    let dashboard = match build_dashboard(&config) {
        Ok(dashboard) => dashboard,
        Err(e) => {
            eprintln!("❌ Failed to initialize dashboard: {}", e);
            std::process::exit(1);
        }
    };

    let selection = match Selection::for_request(dashboard.catalog(), &sector, requested(&tickers)) {
        Ok(selection) => selection,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    println!("📊 {} - {} tickers\n", selection.sector, selection.tickers.len());

    println!("📈 Return over {}", period.label());
    match dashboard.return_chart(&selection, period).await {
        SectionOutcome::Ready(chart) => {
            for line in render_returns(&chart) {
                println!("{}", line);
            }
        }
        other => print_outcome(&other),
    }

    println!("\n═══════════════════════════════════════════════════════════\n");
    println!("🔍 Peer comparison (last value: ticker / peer average / {})", dashboard.benchmark_label());
    match dashboard.comparison_grid(&selection).await {
        SectionOutcome::Ready(grid) => {
            for line in render_grid(&grid) {
                println!("{}", line);
            }
            if !grid.skipped_periods.is_empty() {
                let skipped: Vec<&str> = grid.skipped_periods.iter().map(|p| p.code()).collect();
                println!("\n⚠️  Skipped periods: {}", skipped.join(", "));
            }
        }
        other => print_outcome(&other),
    }
}

fn print_outcome<T>(outcome: &SectionOutcome<T>) {
    match outcome {
        SectionOutcome::Ready(_) => {}
        SectionOutcome::Warning(m) => println!("⚠️  {}", m),
        SectionOutcome::Failed(m) => eprintln!("❌ {}", m),
        SectionOutcome::RateLimited(m) => eprintln!("⏳ {}", m),
    }
}

fn last_value(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().find_map(|v| *v)
}

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.2}%", v),
        None => "-".to_string(),
    }
}

fn render_returns(chart: &ReturnChart) -> Vec<String> {
    let mut lines: Vec<String> = chart
        .returns
        .columns()
        .iter()
        .map(|c| format!("   {:<24} {:>10}", c.key, pct(last_value(&c.values))))
        .collect();
    lines.push(format!(
        "   {:<24} {:>10}",
        chart.benchmark.name,
        pct(last_value(&chart.benchmark.values))
    ));
    lines.push(format!("   axis [{:.2}, {:.2}]", chart.domain.min, chart.domain.max));
    lines
}

fn render_grid(grid: &ComparisonGrid) -> Vec<String> {
    let mut lines = Vec::new();
    for row in &grid.rows {
        lines.push(format!("🔹 {}", row.name));
        for cell in &row.cells {
            match cell {
                GridCell::Chart { period, subject, peer_average, benchmark, domain } => {
                    lines.push(format!(
                        "   {:<4} {:>10} / {:>10} / {:>10}   axis [{:.1}, {:.1}]",
                        period.code(),
                        pct(last_value(&subject.values)),
                        pct(peer_average.as_ref().and_then(|s| last_value(&s.values))),
                        pct(benchmark.as_ref().and_then(|s| last_value(&s.values))),
                        domain.min,
                        domain.max
                    ));
                }
                GridCell::NoData { period } => {
                    lines.push(format!("   {:<4} no data", period.code()));
                }
            }
        }
    }
    lines
}
