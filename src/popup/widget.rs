use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};

use super::currency::{Conversion, CurrencyConverter, CurrencyPair};
use super::debounce::Debouncer;

/// What the widget currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetView {
    pub pair: CurrencyPair,
    pub input: String,
    pub output: Option<Conversion>,
}

/// Debounced currency widget.
///
/// Amount edits are converted once input has been quiet for the debounce
/// window. If a conversion is still running when the window closes, the
/// new one is skipped rather than queued.
pub struct CurrencyWidget {
    converter: Arc<Mutex<CurrencyConverter>>,
    debouncer: Debouncer,
    view: Arc<watch::Sender<WidgetView>>,
}

impl CurrencyWidget {
    pub fn new(converter: CurrencyConverter, quiet: Duration) -> Self {
        let (view, _) = watch::channel(WidgetView {
            pair: converter.pair(),
            ..WidgetView::default()
        });

        Self {
            converter: Arc::new(Mutex::new(converter)),
            debouncer: Debouncer::new(quiet),
            view: Arc::new(view),
        }
    }

    /// Receive every view update.
    pub fn subscribe(&self) -> watch::Receiver<WidgetView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> WidgetView {
        self.view.borrow().clone()
    }

    /// Amount field changed.
    pub fn input(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.view.send_modify(|view| view.input = value.clone());

        let converter = self.converter.clone();
        let view = self.view.clone();
        self.debouncer.call(async move {
            let Ok(mut converter) = converter.try_lock() else {
                tracing::debug!("Conversion already in progress, skipping '{}'", value);
                return;
            };

            let output = converter.convert(&value).await;
            if let Some(ref conversion) = output {
                tracing::info!(
                    "{} {} = {} {} ({} rate {})",
                    conversion.amount,
                    conversion.quote.pair.from,
                    conversion.display,
                    conversion.quote.pair.to,
                    conversion.quote.source.label(),
                    conversion.quote.rate
                );
            }
            view.send_modify(|v| {
                v.pair = converter.pair();
                v.input = value.clone();
                v.output = output;
            });
        });
    }

    /// Reverse the direction; clears input and output.
    pub async fn swap(&mut self) {
        self.debouncer.cancel();
        let mut converter = self.converter.lock().await;
        converter.swap();
        let pair = converter.pair();
        self.view.send_replace(WidgetView {
            pair,
            input: String::new(),
            output: None,
        });
    }

    /// Wait for any scheduled conversion to finish.
    pub async fn settle(&mut self) {
        self.debouncer.flush().await;
        // a job that was skipped or still running holds no handle; wait for the lock
        let _ = self.converter.lock().await;
    }
}
