//! # ebinterface-web
//!
//! Upload ebInterface invoices (versions 4.0 – 5.0), validate them against
//! schema and business rules, render a PDF report, or convert them into
//! XRechnung UBL 2.1.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! The XRechnung side follows the EN 16931 semantic model.
//!
//! ## Quick Start
//!
//! ```rust
//! use ebinterface_web::convert::XRechnungConverter;
//! use ebinterface_web::ebinterface::{classify, EbInterfaceVersion, SchemaRegistry};
//!
//! let xml = br#"<Invoice xmlns="http://www.ebinterface.at/schema/4p3/"/>"#;
//! let version = classify(xml).unwrap();
//! assert_eq!(version, EbInterfaceVersion::V43);
//!
//! // An empty invoice is not schema-valid.
//! let schemas = SchemaRegistry::compile_all();
//! let errors = schemas.get(version).unwrap().validate(xml).unwrap_err();
//! assert!(errors.contains_error());
//! # let _ = XRechnungConverter::default();
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`ebinterface`] | version detection, schema validation, document model |
//! | [`convert`] | ebInterface → XRechnung mapping |
//! | [`xrechnung`] | UBL serialisation, BR-DE rules |
//! | [`rules`] | business rules compiled from XML |
//! | [`report`] | PDF report from a compiled template |
//! | [`pipeline`] | submission workflows |
//! | [`context`] | startup bootstrap |
//! | [`zugferd`] | ZUGFeRD 1.0 recognition |
//! | `server` | axum router (feature `server`) |

pub mod config;
pub mod context;
pub mod convert;
pub mod core;
pub mod ebinterface;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod xrechnung;
pub mod zugferd;

#[cfg(feature = "server")]
pub mod server;

pub use crate::config::{AppConfig, LandingPage};
pub use crate::context::{AppContext, bootstrap};
pub use crate::core::{EbiError, ErrorItem, ErrorList, Locale, Severity};
