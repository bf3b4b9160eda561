//! ebInterface input side: version detection, schema validation and the
//! typed document model.
//!
//! ```rust
//! use ebinterface_web::ebinterface::{classify, EbInterfaceVersion};
//!
//! let xml = br#"<Invoice xmlns="http://www.ebinterface.at/schema/4p3/"/>"#;
//! assert_eq!(classify(xml).unwrap(), EbInterfaceVersion::V43);
//! ```

mod classify;
mod model;
mod read;
pub mod schema;
pub mod schemas;
mod tree;
mod version;

pub use classify::classify;
pub use model::*;
pub use read::read_invoice;
pub use schema::CompiledSchema;
pub use schemas::SchemaRegistry;
pub use tree::{XmlElement, parse_tree};
pub use version::{EbInterfaceVersion, TaxLayout};
