use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use rolys::api::RatesClient;
use rolys::host::SystemClock;
use rolys::popup::currency::{Conversion, Currency, CurrencyConverter, CurrencyPair, RateCache};
use rolys::popup::CurrencyWidget;
use rolys::{Result, RolysError};

use super::load_config;
use crate::cli::Cli;

pub async fn run(cli: &Cli, amount: Option<&str>, from: &str, to: &str) -> Result<()> {
    let config = load_config(cli)?;
    let pair = CurrencyPair::new(from.parse::<Currency>()?, to.parse::<Currency>()?)?;

    let mut converter = CurrencyConverter::with_cache(
        Arc::new(RatesClient::from_config(&config)?),
        Arc::new(SystemClock),
        RateCache::new(Duration::from_secs(config.rates.cache_ttl_secs)),
    );
    converter.set_pair(pair);

    match amount {
        Some(amount) => {
            let conversion = converter.convert(amount).await.ok_or_else(|| {
                RolysError::Parse(format!("'{}' is not a positive amount", amount))
            })?;
            print_conversion(cli.json, &conversion);
            Ok(())
        }
        None => interactive(cli, converter, Duration::from_millis(config.rates.debounce_ms)).await,
    }
}

fn print_conversion(json: bool, conversion: &Conversion) {
    if json {
        if let Ok(line) = serde_json::to_string(conversion) {
            println!("{}", line);
        }
        return;
    }
    println!(
        "{} {} {} = {} {} {}",
        "✓".green(),
        conversion.amount,
        conversion.quote.pair.from,
        conversion.display.bold(),
        conversion.quote.pair.to,
        format!("({} rate {:.4})", conversion.quote.source.label(), conversion.quote.rate).dimmed()
    );
}

/// Each stdin line is an edit of the amount field; `swap` reverses the pair.
async fn interactive(cli: &Cli, converter: CurrencyConverter, quiet: Duration) -> Result<()> {
    let mut widget = CurrencyWidget::new(converter, quiet);
    let mut updates = widget.subscribe();

    let json = cli.json;
    let printer = tokio::spawn(async move {
        let mut shown = updates.borrow().clone();
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            if view.pair != shown.pair && !json {
                println!("{} {}", "●".cyan(), view.pair);
            }
            if view.output != shown.output {
                if let Some(ref conversion) = view.output {
                    print_conversion(json, conversion);
                }
            }
            shown = view;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "swap" => widget.swap().await,
            value => widget.input(value),
        }
    }

    widget.settle().await;
    drop(widget);
    let _ = printer.await;
    Ok(())
}
