//! # pdf-regions-api
//!
//! REST API server for previewing and exporting region-masked PDFs
//!

mod api;
mod config;


pub use api::{
    app, export_pdf, health_check, preview_pdf, AppError, AppState, ErrorResponse, ExportData,
    ExportResponse, PDF_FIELD, SELECTION_FIELD,
};
pub use config::{ConfigError, ServerConfig};
