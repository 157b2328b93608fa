//! Generador de reportes de facturación: combina archivos Excel subidos,
//! filtra por empresa, año y mes, y produce el reporte mensual como libro
//! Excel (Ravago) o documento Word (resto de empresas), con una
//! previsualización HTML equivalente.

pub mod config;
pub mod context;
pub mod excel;
pub mod naming;
pub mod preview;
pub mod report;
pub mod table;
pub mod word;

pub use config::Config;
pub use context::{
    fecha_es, format_currency, ReportContext, EMPRESA_ALTIMETRIK, EMPRESA_GWEALTH, EMPRESA_RAVAGO,
};
pub use naming::{build_report_filename, ensure_extension, final_filename, safe_filename};
pub use preview::generate_preview_html;
pub use report::{create_report, MIME_DOCX, MIME_XLSX};
pub use table::{filter_options, filter_table, load_workbooks, FilterOptions, Table, TODAS, TODOS};
