mod client;
mod packager;
mod rates;
pub mod types;

pub use client::{build_client, endpoint};
pub use packager::{ImagePackager, PackagerClient};
pub use rates::{RateSource, RatesClient};
