//! Résumé assembly in JSON Resume shape, plus its HTML and PDF renderings.

pub mod builder;
pub mod handlers;
pub mod pdf;
pub mod render;

pub use builder::{get_cv_data, Resume};
pub use pdf::PdfRenderer;
