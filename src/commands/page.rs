use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use rolys::host::{Clipboard, Notifier, StdoutClipboard, TerminalNotifier};
use rolys::message::{Action, ActionResponse};
use rolys::runtime::{load_page, LocalExtension};
use rolys::worker::DownloadSummary;
use rolys::{Result, RolysError};

use super::load_config;
use crate::cli::Cli;

/// Notifier for --json mode: everything goes to the log on stderr.
struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, _duration: Duration) {
        tracing::info!("{}", message);
    }

    fn alert(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Spinner shown while background work finishes. `None` in JSON mode.
fn create_spinner(json: bool, message: &str) -> Option<ProgressBar> {
    if json {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("  {spinner} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// Clipboard for --json mode: the address is printed as a JSON object.
struct JsonClipboard;

impl Clipboard for JsonClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        println!("{}", serde_json::json!({ "address": text }));
        Ok(())
    }
}

/// The popup already told the user why; this only sets the exit status.
fn not_run() -> RolysError {
    RolysError::Other("The action did not run on this page".to_string())
}

fn notifier(cli: &Cli) -> Arc<dyn Notifier> {
    if cli.json {
        Arc::new(LogNotifier)
    } else {
        Arc::new(TerminalNotifier)
    }
}

async fn run_action(
    cli: &Cli,
    page: &str,
    tab_url: Option<&str>,
    action: Action,
) -> Result<(Option<ActionResponse>, DownloadSummary)> {
    let config = load_config(cli)?;
    let (html, page_url) =
        load_page(page, Duration::from_secs(config.packager.timeout_secs)).await?;
    let tab_url = tab_url.unwrap_or(&page_url);

    let extension = LocalExtension::with_html(
        &config,
        html,
        tab_url,
        notifier(cli),
        Arc::new(StdoutClipboard),
    )?;
    let response = extension.popup().click(action).await;

    let spinner = match response {
        Some(ActionResponse::Images { count }) if count > 0 => {
            create_spinner(cli.json, "Waiting for packaging and downloads...")
        }
        _ => None,
    };
    let summary = extension.shutdown().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    Ok((response, summary))
}

pub async fn extract_text(cli: &Cli, page: &str, tab_url: Option<&str>) -> Result<()> {
    let (response, _) = run_action(cli, page, tab_url, Action::ExtractText).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    match response {
        Some(ActionResponse::Text { success: true, .. }) => Ok(()),
        Some(ActionResponse::Text { message, .. }) => Err(RolysError::Other(message)),
        _ => Err(not_run()),
    }
}

pub async fn download_images(cli: &Cli, page: &str, tab_url: Option<&str>) -> Result<()> {
    let (response, summary) = run_action(cli, page, tab_url, Action::DownloadImages).await?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "response": response,
                "completed": summary.completed,
                "interrupted": summary
                    .interrupted
                    .iter()
                    .map(|(id, error)| serde_json::json!({ "id": id, "error": error }))
                    .collect::<Vec<_>>(),
            })
        );
    } else {
        for _ in &summary.completed {
            println!("{} Archive downloaded", "✓".green());
        }
        for (id, error) in &summary.interrupted {
            println!("{} Download {} interrupted: {}", "✗".red(), id, error);
        }
    }

    match response {
        Some(ActionResponse::Images { count }) if count > 0 => {
            if summary.completed.is_empty() {
                Err(RolysError::RemoteService(
                    "Images were collected but no archive was downloaded".to_string(),
                ))
            } else {
                Ok(())
            }
        }
        Some(_) => Err(RolysError::NoImagesFound),
        None => Err(not_run()),
    }
}

pub async fn copy_address(cli: &Cli, url: &str) -> Result<()> {
    let config = load_config(cli)?;
    let clipboard: Arc<dyn Clipboard> = if cli.json {
        Arc::new(JsonClipboard)
    } else {
        Arc::new(StdoutClipboard)
    };

    let extension = LocalExtension::with_html(&config, "", url, notifier(cli), clipboard)?;
    let copied = extension.popup().copy_address().await;
    extension.shutdown().await;

    copied.map(|_| ()).ok_or_else(not_run)
}
