use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use referral_tree_dashboard::platform::Platform;

#[derive(Parser)]
#[command(name = "referral-dashboard")]
#[command(about = "Referral hierarchy dashboard API and data tools.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default).
    Serve,
    /// Import users, purchases and earnings from CSV exports.
    ImportCsv {
        #[arg(long, value_enum, default_value_t = AppChoice::All)]
        app: AppChoice,
        /// Directory holding `limitless/` and `boostyfi/` export folders.
        #[arg(long, default_value = "../sheets")]
        sheets_dir: PathBuf,
        /// Delete existing rows of the imported platforms first.
        #[arg(long)]
        clear: bool,
    },
    /// Import the Limitless rank-users export into wallet profiles.
    ImportWalletProfiles {
        csv_file: PathBuf,
        #[arg(long)]
        clear: bool,
    },
    /// Recompute nested-set columns from parent links.
    RebuildTree {
        #[arg(long, value_enum, default_value_t = AppChoice::All)]
        app: AppChoice,
    },
    /// Create a dashboard account.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, env = "DASHBOARD_PASSWORD")]
        password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "")]
        full_name: String,
        #[arg(long)]
        seller: bool,
        #[arg(long)]
        staff: bool,
    },
    /// Replace a dashboard account's password.
    SetPassword {
        #[arg(long)]
        username: String,
        #[arg(long, env = "DASHBOARD_PASSWORD")]
        password: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AppChoice {
    Limitless,
    Boostyfi,
    All,
}

impl AppChoice {
    pub fn platforms(self) -> &'static [Platform] {
        match self {
            AppChoice::Limitless => &[Platform::Limitless],
            AppChoice::Boostyfi => &[Platform::Boostyfi],
            AppChoice::All => &Platform::ALL,
        }
    }
}
