//! gradebook-report: Report generation for gradebook rosters.

pub mod html;

pub use html::{generate_html, write_html_report};
