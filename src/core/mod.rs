//! Shared building blocks: error types, the XRechnung target model,
//! totals calculation, code lists and locales.

pub mod codes;
mod error;
mod locale;
mod totals;
mod types;

pub use error::*;
pub use locale::Locale;
pub use totals::{calculate_totals, checked_sum};
pub use types::*;
