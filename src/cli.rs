use clap::{Parser, Subcommand};

use crate::commands;

#[derive(Parser)]
#[command(name = "sectorlens")]
#[command(about = "Sector peer-comparison dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "SECTORLENS_PORT")]
        port: Option<u16>,
    },
    /// List sectors and their tickers
    Sectors,
    /// Print returns and the peer comparison for a sector
    Compare {
        /// Sector name from the catalog
        #[arg(short, long)]
        sector: String,
        /// Ticker to include; repeat for several. Defaults to the whole sector
        #[arg(short, long = "ticker")]
        tickers: Vec<String>,
        /// Return period (5d, 1mo, 3mo, 6mo, 1y, 3y, 5y, 10y, 20y)
        #[arg(long, default_value = "5y")]
        period: String,
    },
    /// Print the shareholder-metrics table for a sector
    Fundamentals {
        /// Sector name from the catalog
        #[arg(short, long)]
        sector: String,
        /// Ticker to include; repeat for several. Defaults to the whole sector
        #[arg(short, long = "ticker")]
        tickers: Vec<String>,
        /// Emit CSV instead of an aligned table
        #[arg(long)]
        csv: bool,
    },
}

pub async fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            commands::serve::run(port).await;
        }
        Commands::Sectors => {
            commands::sectors::run();
        }
        Commands::Compare { sector, tickers, period } => {
            commands::compare::run(sector, tickers, period).await;
        }
        Commands::Fundamentals { sector, tickers, csv } => {
            commands::fundamentals::run(sector, tickers, csv).await;
        }
    }
}
