pub mod table;
#[cfg(feature = "tickers")]
pub mod tickers;

pub use table::{PriceSeries, PriceTable};
