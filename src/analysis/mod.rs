//! Property analysis module - functional pipeline from raw listing to
//! scored, ranked record

pub mod collection;
pub mod enrich;
pub mod error;
pub mod export;
pub mod import;
pub mod lookup;
pub mod process;
pub mod rank;
pub mod score;
pub mod types;
pub mod utils;
pub mod validate;

pub use types::*;
