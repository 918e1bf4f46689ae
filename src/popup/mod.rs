//! Popup controller: turns button clicks into content-script requests and
//! shows the outcome as a transient notification.

pub mod currency;
mod debounce;
mod widget;

pub use debounce::Debouncer;
pub use widget::{CurrencyWidget, WidgetView};

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::content::ContentScript;
use crate::error::{Result, RolysError};
use crate::host::{Clipboard, Notifier};
use crate::message::{Action, ActionRequest, ActionResponse};

/// Pages extensions are not allowed to script.
const SPECIAL_PAGE_PREFIXES: &[&str] = &["chrome://", "about:"];

const REMEDIATION_STEPS: &str = "Please try:\n1. Press F5 to refresh the page\n2. Reload the extension in chrome://extensions/\n3. Click the button again";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: u64,
    pub url: String,
}

/// Resolves the active tab of the current window.
#[async_trait]
pub trait TabProvider: Send + Sync {
    async fn active_tab(&self) -> Option<Tab>;
}

/// A single, fixed tab.
#[derive(Debug, Clone)]
pub struct StaticTab(pub Tab);

#[async_trait]
impl TabProvider for StaticTab {
    async fn active_tab(&self) -> Option<Tab> {
        Some(self.0.clone())
    }
}

/// Request/response channel to the content script of a tab.
#[async_trait]
pub trait ContentChannel: Send + Sync {
    async fn send(&self, tab_id: u64, request: ActionRequest) -> Result<ActionResponse>;
}

/// Delivers requests to a content script living in the same process.
pub struct LocalContentChannel {
    tab_id: u64,
    script: Arc<ContentScript>,
}

impl LocalContentChannel {
    pub fn new(tab_id: u64, script: Arc<ContentScript>) -> Self {
        Self { tab_id, script }
    }
}

#[async_trait]
impl ContentChannel for LocalContentChannel {
    async fn send(&self, tab_id: u64, request: ActionRequest) -> Result<ActionResponse> {
        if tab_id != self.tab_id {
            return Err(RolysError::Messaging(
                "Could not establish connection. Receiving end does not exist.".to_string(),
            ));
        }
        Ok(self.script.handle(request).await)
    }
}

pub fn is_special_page(url: &str) -> bool {
    SPECIAL_PAGE_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

/// Page address without query string or fragment.
pub fn clean_address(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| RolysError::Parse(format!("Invalid URL '{}': {}", url, e)))?;

    let origin = parsed.origin();
    if origin.is_tuple() {
        return Ok(format!("{}{}", origin.ascii_serialization(), parsed.path()));
    }

    // file:// and other opaque origins
    let mut stripped = parsed;
    stripped.set_query(None);
    stripped.set_fragment(None);
    Ok(stripped.to_string())
}

/// Message shown when the content script cannot be reached.
pub fn messaging_failure_message(error: &RolysError) -> String {
    let reason = match error {
        RolysError::Messaging(reason) => reason.clone(),
        other => other.to_string(),
    };
    format!("Message delivery failed: {}\n\n{}", reason, REMEDIATION_STEPS)
}

/// Removes the action from the in-flight set when the click finishes.
struct InFlight<'a> {
    actions: &'a Mutex<HashSet<Action>>,
    action: Action,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut actions = self.actions.lock().unwrap_or_else(|e| e.into_inner());
        actions.remove(&self.action);
    }
}

pub struct PopupController {
    tabs: Arc<dyn TabProvider>,
    channel: Arc<dyn ContentChannel>,
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn Clipboard>,
    notification: Duration,
    in_flight: Mutex<HashSet<Action>>,
}

impl PopupController {
    pub fn new(
        tabs: Arc<dyn TabProvider>,
        channel: Arc<dyn ContentChannel>,
        notifier: Arc<dyn Notifier>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            tabs,
            channel,
            notifier,
            clipboard,
            notification: Duration::from_millis(3000),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_notification_duration(mut self, duration: Duration) -> Self {
        self.notification = duration;
        self
    }

    fn notify(&self, message: &str) {
        self.notifier.notify(message, self.notification);
    }

    fn begin(&self, action: Action) -> Option<InFlight<'_>> {
        let mut actions = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !actions.insert(action) {
            return None;
        }
        Some(InFlight {
            actions: &self.in_flight,
            action,
        })
    }

    /// Active tab, unless there is none or it is a special page.
    async fn scriptable_tab(&self) -> Result<Tab> {
        let tab = self.tabs.active_tab().await.ok_or(RolysError::NoActiveTab)?;
        tracing::debug!("Active tab {} ({})", tab.id, tab.url);

        if is_special_page(&tab.url) {
            return Err(RolysError::SpecialPage(tab.url));
        }
        Ok(tab)
    }

    /// Handle an action button click.
    ///
    /// Returns the content script's response, or `None` when no request was
    /// sent or it could not be delivered. A click on an action that is
    /// still in flight is ignored.
    pub async fn click(&self, action: Action) -> Option<ActionResponse> {
        tracing::info!("User clicked '{}'", action);

        let Some(_guard) = self.begin(action) else {
            tracing::debug!("'{}' already in flight, ignoring click", action);
            return None;
        };

        let tab = match self.scriptable_tab().await {
            Ok(tab) => tab,
            Err(RolysError::NoActiveTab) => {
                tracing::error!("No active tab found");
                return None;
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.notify("Cannot run on special pages");
                return None;
            }
        };

        match self.channel.send(tab.id, ActionRequest::new(action)).await {
            Ok(response) => {
                tracing::debug!("Response for '{}': {:?}", action, response);
                self.notify(&response.user_message());
                Some(response)
            }
            Err(e) => {
                tracing::error!("Message delivery to tab {} failed: {:?}", tab.id, e);
                self.notify(&messaging_failure_message(&e));
                None
            }
        }
    }

    /// Copy the active tab's address without query or fragment.
    pub async fn copy_address(&self) -> Option<String> {
        tracing::info!("User clicked 'copy address'");

        let tab = match self.scriptable_tab().await {
            Ok(tab) => tab,
            Err(RolysError::NoActiveTab) => {
                tracing::error!("No active tab found");
                return None;
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.notify("Cannot run on special pages");
                return None;
            }
        };

        let address = match clean_address(&tab.url) {
            Ok(address) => address,
            Err(e) => {
                tracing::error!("URL parsing failed: {}", e);
                self.notify("URL parsing failed");
                return None;
            }
        };

        match self.clipboard.write_text(&address) {
            Ok(()) => {
                self.notify("Address copied to clipboard!");
                Some(address)
            }
            Err(e) => {
                tracing::error!("Copy failed: {}", e);
                self.notify("Copy failed, please try again");
                None
            }
        }
    }
}
