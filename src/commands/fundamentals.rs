use crate::commands::{build_dashboard, requested};
use crate::dashboard::SectionOutcome;
use crate::models::{DashboardConfig, FundamentalsRow, FundamentalsTable, Selection};

pub async fn run(sector: String, tickers: Vec<String>, csv: bool) {
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

    let table = match dashboard.fundamentals_table(&selection).await {
        SectionOutcome::Ready(table) => table,
        SectionOutcome::Warning(m) => {
            println!("⚠️  {}", m);
            return;
        }
        SectionOutcome::Failed(m) | SectionOutcome::RateLimited(m) => {
            eprintln!("❌ {}", m);
            std::process::exit(1);
        }
    };

    if csv {
        match table.to_csv() {
            Ok(content) => print!("{}", content),
            Err(e) => {
                eprintln!("❌ CSV error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("📋 Shareholder metrics - {}\n", selection.sector);
    for line in render(&table) {
        println!("{}", line);
    }
    if !table.skipped.is_empty() {
        println!("\n⚠️  No data for: {}", table.skipped.join(", "));
    }
    println!("\n🕒 Last updated: {}", table.last_updated_label());
}

/// Plain-text table with columns padded to their widest cell
fn render(table: &FundamentalsTable) -> Vec<String> {
    let headers: Vec<String> = FundamentalsRow::headers().iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| r.formatted_cells().to_vec())
        .collect();

    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width.saturating_sub(cell.chars().count());
                format!("{}{}", " ".repeat(pad), cell)
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_line(&headers));
    for row in &rows {
        lines.push(format_line(row));
    }
    lines
}
