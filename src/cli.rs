use clap::{Parser, Subcommand};

use crate::commands;
use rolys::Result;

/// Rolys - grab text and images from a page's content region
#[derive(Parser)]
#[command(name = "rolys")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Download directory (overrides config)
    #[arg(long, env = "ROLYS_DOWNLOAD_DIR", global = true)]
    pub download_dir: Option<String>,

    /// CSS selector of the content region (overrides config)
    #[arg(long, global = true)]
    pub selector: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the content region's text into page-text-<millis>.txt
    ExtractText {
        /// Saved HTML file or http(s) URL of the page
        page: String,

        /// Address reported as the active tab (defaults to the page location)
        #[arg(long)]
        tab_url: Option<String>,
    },

    /// Package the content region's images and download the archive
    DownloadImages {
        /// Saved HTML file or http(s) URL of the page
        page: String,

        /// Address reported as the active tab (defaults to the page location)
        #[arg(long)]
        tab_url: Option<String>,
    },

    /// Print a page address without query string or fragment
    CopyAddress {
        /// Page address
        url: String,
    },

    /// Convert between USD and CNY (reads amounts from stdin when omitted)
    Convert {
        /// Amount to convert
        amount: Option<String>,

        /// Source currency
        #[arg(long, default_value = "usd")]
        from: String,

        /// Target currency
        #[arg(long, default_value = "cny")]
        to: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. rates.base_url)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show configuration file path
    Path,

    /// Delete the configuration file
    Reset,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::ExtractText { page, tab_url } => {
                commands::page::extract_text(self, page, tab_url.as_deref()).await
            }
            Commands::DownloadImages { page, tab_url } => {
                commands::page::download_images(self, page, tab_url.as_deref()).await
            }
            Commands::CopyAddress { url } => commands::page::copy_address(self, url).await,
            Commands::Convert { amount, from, to } => {
                commands::convert::run(self, amount.as_deref(), from, to).await
            }
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}
