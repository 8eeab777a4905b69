pub mod config;
pub mod enums;
pub mod error;
pub mod cache;
pub mod storage;
pub mod tcgcsv;
pub mod fallback;
pub mod services;
pub mod scheduler;
pub mod alert_checker;

pub use config::Config;
pub use enums::{ PriceStatus, ProductType, Series };
pub use error::{ AppError, Result };
