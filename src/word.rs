use anyhow::Result;
use docx_rs::{
    AlignmentType, Docx, Footer, Paragraph, Run, RunFonts, Shading, ShdType, Table, TableCell,
    TableRow, VAlignType,
};

use crate::context::{format_amount, format_currency, ReportContext};

const FUENTE: &str = "Calibri Light";

// Paleta del diseño: azul primario para cabeceras, magenta de acento para
// filas de total, gris claro para el cuerpo.
const COLOR_PRIMARIO: &str = "003366";
const COLOR_ACENTO: &str = "E20074";
const COLOR_GRIS_CLARO: &str = "F0F0F0";
const COLOR_BLANCO: &str = "FFFFFF";
const COLOR_NEGRO: &str = "000000";

const PIE_CONTACTO: &str =
    "Número: 601 - 7455289 | Dirección: Carrera 7 No. 74B-56, Oficina 301 | Correo: info@biu.com.co";

#[derive(Clone, Copy)]
enum Fila {
    Cabecera,
    Cuerpo,
    Total,
}

impl Fila {
    fn fill(self) -> &'static str {
        match self {
            Fila::Cabecera => COLOR_PRIMARIO,
            Fila::Cuerpo => COLOR_GRIS_CLARO,
            Fila::Total => COLOR_ACENTO,
        }
    }

    fn texto(self) -> (&'static str, bool) {
        match self {
            Fila::Cabecera | Fila::Total => (COLOR_BLANCO, true),
            Fila::Cuerpo => (COLOR_NEGRO, false),
        }
    }
}

fn celda(text: &str, fila: Fila) -> TableCell {
    let (color, bold) = fila.texto();
    let mut run = Run::new()
        .add_text(text)
        .size(22)
        .color(color)
        .fonts(RunFonts::new().ascii(FUENTE));
    if bold {
        run = run.bold();
    }
    TableCell::new()
        .shading(Shading::new().shd_type(ShdType::Clear).fill(fila.fill()))
        .vertical_align(VAlignType::Center)
        .add_paragraph(Paragraph::new().add_run(run))
}

fn celda_centrada(text: &str, fila: Fila, span: usize) -> TableCell {
    let (color, bold) = fila.texto();
    let mut run = Run::new()
        .add_text(text)
        .size(22)
        .color(color)
        .fonts(RunFonts::new().ascii(FUENTE));
    if bold {
        run = run.bold();
    }
    let mut cell = TableCell::new()
        .shading(Shading::new().shd_type(ShdType::Clear).fill(fila.fill()))
        .vertical_align(VAlignType::Center)
        .add_paragraph(Paragraph::new().add_run(run).align(AlignmentType::Center));
    if span > 1 {
        cell = cell.grid_span(span);
    }
    cell
}

fn titulo(text: &str, size_half_points: usize) -> Paragraph {
    Paragraph::new().add_run(
        Run::new()
            .add_text(text)
            .size(size_half_points)
            .bold()
            .color(COLOR_PRIMARIO)
            .fonts(RunFonts::new().ascii(FUENTE)),
    )
}

fn parrafo(text: &str) -> Paragraph {
    Paragraph::new().add_run(
        Run::new()
            .add_text(text)
            .size(22)
            .fonts(RunFonts::new().ascii(FUENTE)),
    )
}

/// Tabla principal de datos con la fila de total fusionada. El valor de la
/// fila de total sigue la regla por empresa: moda para Gwealth, suma para
/// el resto.
fn tabla_principal(ctx: &ReportContext) -> Option<Table> {
    let columnas = &ctx.columnas_principales;
    if columnas.is_empty() {
        return None;
    }

    let valor_de = |det: &crate::context::DetailRow, col: &str| -> String {
        match col {
            "MES ASIGNACION" => det.mes.clone(),
            "AÑO ASIGNACION" => det.anio.clone(),
            "NOMBRE" => det.nombre.clone(),
            "MONEDA" => det.moneda.clone(),
            "VALOR" => det
                .valor
                .map(format_amount)
                .unwrap_or_else(|| String::new()),
            _ => String::new(),
        }
    };

    let mut rows = vec![TableRow::new(
        columnas.iter().map(|c| celda(c, Fila::Cabecera)).collect(),
    )];

    for det in &ctx.detalles {
        rows.push(TableRow::new(
            columnas.iter().map(|c| celda(&valor_de(det, c), Fila::Cuerpo)).collect(),
        ));
    }

    // Fila Total: etiqueta fusionada sobre todas las columnas menos VALOR
    if let Some(val_idx) = columnas.iter().position(|c| c == "VALOR") {
        let etiqueta = if ctx.is_gwealth() { "Total (precio único)" } else { "Total" };
        let total = format_amount(ctx.total_tabla_principal());
        let mut cells = Vec::new();
        if val_idx > 0 {
            cells.push(celda_centrada(etiqueta, Fila::Total, val_idx));
        }
        cells.push(celda(&total, Fila::Total));
        rows.push(TableRow::new(cells));
    }

    Some(Table::new(rows))
}

/// Resumen específico por empresa: una sola fila para Altimetrik; filas
/// TOTAL y TOTAL CON IVA con celdas fusionadas para Gwealth. Las demás
/// empresas no llevan resumen.
fn tabla_resumen(ctx: &ReportContext) -> Option<Table> {
    let cabecera = TableRow::new(vec![
        celda("Mes", Fila::Cabecera),
        celda("Concepto", Fila::Cabecera),
        celda("Total", Fila::Cabecera),
    ]);

    if ctx.empresa == crate::context::EMPRESA_ALTIMETRIK {
        let cuerpo = TableRow::new(vec![
            celda(&ctx.mes, Fila::Cuerpo),
            celda(&ctx.concepto_consultas(), Fila::Cuerpo),
            celda(&format_currency(ctx.total_valor), Fila::Cuerpo),
        ]);
        return Some(Table::new(vec![cabecera, cuerpo]).set_grid(vec![1728, 6048, 2016]));
    }

    if ctx.is_gwealth() {
        let cuerpo = TableRow::new(vec![
            celda(&ctx.mes, Fila::Cuerpo),
            celda(&ctx.concepto_consultas(), Fila::Cuerpo),
            celda(&format_currency(ctx.precio_unico), Fila::Cuerpo),
        ]);
        let total = TableRow::new(vec![
            celda_centrada("TOTAL", Fila::Total, 2),
            celda(&format_currency(ctx.precio_unico), Fila::Total),
        ]);
        let total_iva = TableRow::new(vec![
            celda_centrada("TOTAL CON IVA", Fila::Total, 2),
            celda(&format_currency(ctx.total_con_iva()), Fila::Total),
        ]);
        return Some(
            Table::new(vec![cabecera, cuerpo, total, total_iva]).set_grid(vec![1728, 6048, 2016]),
        );
    }

    None
}

/// Genera el documento Word para todas las empresas distintas de Ravago.
pub fn generate_report(ctx: &ReportContext) -> Result<Vec<u8>> {
    let mut doc = Docx::new()
        .default_fonts(RunFonts::new().ascii(FUENTE))
        .default_size(22);

    // Marcador de logo alineado a la derecha
    doc = doc.add_paragraph(
        Paragraph::new()
            .add_run(
                Run::new()
                    .add_text("[Logo BIU]")
                    .bold()
                    .fonts(RunFonts::new().ascii(FUENTE)),
            )
            .align(AlignmentType::Right),
    );

    // Regla horizontal bajo el logo
    doc = doc.add_paragraph(parrafo(&"_".repeat(72)));

    doc = doc.add_paragraph(titulo(
        &format!("FACTURACIÓN {} {}", ctx.mes.to_uppercase(), ctx.anio),
        48,
    ));
    doc = doc.add_paragraph(titulo(&ctx.empresa.to_uppercase(), 40));

    doc = doc.add_paragraph(parrafo(&format!(
        "Fecha de corte del reporte: {}",
        ctx.fecha_corte_es()
    )));
    doc = doc.add_paragraph(parrafo(&format!(
        "Funcionario que reporta: \t {}",
        ctx.reporta
    )));
    doc = doc.add_paragraph(parrafo(&format!(
        "Funcionario revisor: \t\t {}",
        ctx.revisor
    )));

    doc = doc.add_paragraph(Paragraph::new());
    match tabla_principal(ctx) {
        Some(t) => doc = doc.add_table(t),
        None => {
            doc = doc.add_paragraph(parrafo(
                "Error: No se encontraron las columnas necesarias en los datos.",
            ))
        }
    }

    if let Some(resumen) = tabla_resumen(ctx) {
        doc = doc.add_paragraph(Paragraph::new());
        doc = doc.add_table(resumen);
    }

    doc = doc.footer(
        Footer::new().add_paragraph(
            Paragraph::new()
                .add_run(
                    Run::new()
                        .add_text(PIE_CONTACTO)
                        .size(18)
                        .fonts(RunFonts::new().ascii(FUENTE)),
                )
                .align(AlignmentType::Center),
        ),
    );

    let mut buf = Vec::new();
    doc.build().pack(&mut std::io::Cursor::new(&mut buf))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ReportContext, EMPRESA_ALTIMETRIK, EMPRESA_GWEALTH};
    use crate::table::{Cell, Table as DataTable};
    use chrono::NaiveDate;

    fn context_for(empresa: &str, valores: &[f64]) -> ReportContext {
        let mut t = DataTable::new(vec![
            "EMPRESA".into(),
            "AÑO ASIGNACION".into(),
            "MES ASIGNACION".into(),
            "NOMBRE".into(),
            "MONEDA".into(),
            "VALOR".into(),
        ]);
        for (i, v) in valores.iter().enumerate() {
            t.rows.push(vec![
                Cell::Text(empresa.into()),
                Cell::Number(2024.0),
                Cell::Text("Mayo".into()),
                Cell::Text(format!("Contraparte {}", i + 1)),
                Cell::Text("USD".into()),
                Cell::Number(*v),
            ]);
        }
        ReportContext::build(
            &t,
            empresa,
            "2024",
            "Mayo",
            "Ana",
            "Luis",
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        )
    }

    #[test]
    fn produces_valid_docx_for_each_empresa() {
        for empresa in [EMPRESA_ALTIMETRIK, EMPRESA_GWEALTH, "Otra Empresa SAS"] {
            let bytes = generate_report(&context_for(empresa, &[50.0, 50.0, 75.0])).unwrap();
            // artefacto OOXML: contenedor ZIP
            assert_eq!(&bytes[..2], b"PK", "empresa {}", empresa);
            assert!(bytes.len() > 1000);
        }
    }

    #[test]
    fn gwealth_main_total_uses_mode() {
        let ctx = context_for(EMPRESA_GWEALTH, &[50.0, 50.0, 75.0]);
        assert_eq!(ctx.total_tabla_principal(), 50.0);
        assert_eq!(format_currency(ctx.total_con_iva()), "USD 59.50");
    }

    #[test]
    fn missing_columns_still_produce_document() {
        let t = DataTable::new(vec!["OTRA COLUMNA".into()]);
        let ctx = ReportContext::build(
            &t,
            EMPRESA_ALTIMETRIK,
            "2024",
            "Mayo",
            "",
            "",
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        );
        let bytes = generate_report(&ctx).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
