//! Dashboard assembly and rendering.

pub mod dashboard;
pub mod generator;

pub use dashboard::build_dashboard;
pub use generator::{
    format_currency, format_percent, generate_json_report, generate_markdown_report,
    RenderOptions,
};
