pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ModelConfig;
pub use error::ForecastError;
pub use traits::{ChartStore, MarketDataProvider};
pub use types::{
    format_years, ChartArtifact, ChartEntry, ChartMetadata, ForecastPoint, ForecastRequest,
    ForecastResult, IndicatorFrame, PricePoint, PriceSeries, RegressorFrame,
};
