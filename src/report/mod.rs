//! Printable PDF report of an ebInterface document.
//!
//! The layout comes from a small XML template compiled once at startup
//! ([`CompiledReportTemplate`]); [`render_pdf`] places the document values
//! onto A4 pages with the PDF standard fonts and breaks the line item table
//! across as many pages as needed.

mod render;
mod template;

pub use render::render_pdf;
pub use template::{
    Align, Column, CompiledReportTemplate, FieldBinding, Footer, Item, LineBinding, LineTable,
    Placement, Summary,
};
