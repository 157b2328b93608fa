use anyhow::Result;

use crate::context::ReportContext;
use crate::excel;
use crate::word;

pub const MIME_XLSX: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Despacho por empresa: Ravago produce el libro Excel, cualquier otra
/// empresa produce el documento Word. Es la única rama de política real
/// del sistema.
pub fn create_report(ctx: &ReportContext) -> Result<(Vec<u8>, &'static str)> {
    if ctx.is_ravago() {
        let bytes = excel::create_ravago_report(ctx)?;
        Ok((bytes, MIME_XLSX))
    } else {
        let bytes = word::generate_report(ctx)?;
        Ok((bytes, MIME_DOCX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ReportContext, EMPRESA_GWEALTH, EMPRESA_RAVAGO};
    use crate::table::{Cell, Table};
    use chrono::NaiveDate;

    fn minimal_context(empresa: &str) -> ReportContext {
        let mut t = Table::new(vec!["EMPRESA".into(), "VALOR".into()]);
        t.rows.push(vec![Cell::Text(empresa.into()), Cell::Number(10.0)]);
        ReportContext::build(
            &t,
            empresa,
            "2024",
            "Mayo",
            "",
            "",
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        )
    }

    #[test]
    fn dispatch_by_empresa() {
        let (_, mime) = create_report(&minimal_context(EMPRESA_RAVAGO)).unwrap();
        assert_eq!(mime, MIME_XLSX);

        let (_, mime) = create_report(&minimal_context(EMPRESA_GWEALTH)).unwrap();
        assert_eq!(mime, MIME_DOCX);

        let (_, mime) = create_report(&minimal_context("Cualquier Otra")).unwrap();
        assert_eq!(mime, MIME_DOCX);
    }
}
