use anyhow::Result;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::context::ReportContext;

// Paleta del layout original: azul corporativo para cabeceras y gris para
// las filas de total.
const AZUL_CABECERA: Color = Color::RGB(0x002060);
const GRIS_TOTAL: Color = Color::RGB(0x808080);

const FORMATO_USD: &str = "\"USD\" #,##0";

const NOTA_TRM: &str = "TRM Aplicable: Según la propuesta, es aquella de emisión de la factura.";
const NOTA_PIE: &str = "biu usually issues monthly invoices for the provision of the Services; \
the amounts indicated in US dollars shall be converted based on the official prevailing market \
rate as of the date of issuance of the invoice.";

struct Estilos {
    titulo: Format,
    info: Format,
    cabecera: Format,
    dato_centro: Format,
    dato_izquierda: Format,
    valor_usd: Format,
    total: Format,
    total_derecha: Format,
    total_usd: Format,
    nota: Format,
    nota_cursiva: Format,
}

impl Estilos {
    fn new() -> Estilos {
        let base = || Format::new().set_font_name("Calibri").set_font_size(11.0);
        Estilos {
            titulo: base().set_font_size(12.0).set_bold().set_align(FormatAlign::Center),
            info: base(),
            cabecera: base()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(AZUL_CABECERA)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap()
                .set_border(FormatBorder::Thin),
            dato_centro: base()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin),
            dato_izquierda: base()
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap()
                .set_border(FormatBorder::Thin),
            valor_usd: base()
                .set_align(FormatAlign::Right)
                .set_align(FormatAlign::VerticalCenter)
                .set_num_format(FORMATO_USD)
                .set_border(FormatBorder::Thin),
            total: base()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(GRIS_TOTAL)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin),
            total_derecha: base()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(GRIS_TOTAL)
                .set_align(FormatAlign::Right)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin),
            total_usd: base()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(GRIS_TOTAL)
                .set_align(FormatAlign::Right)
                .set_align(FormatAlign::VerticalCenter)
                .set_num_format(FORMATO_USD)
                .set_border(FormatBorder::Thin),
            nota: base().set_text_wrap(),
            nota_cursiva: base()
                .set_font_size(9.0)
                .set_italic()
                .set_align(FormatAlign::Top)
                .set_text_wrap(),
        }
    }
}

/// Marco exterior negro de grosor medio alrededor del rectángulo indicado
/// (índices base cero, inclusivos). Las celdas del perímetro están siempre
/// vacías en ambos layouts, así que basta con escribirles el borde.
fn draw_outer_frame(
    ws: &mut Worksheet,
    top: u32,
    bottom: u32,
    left: u16,
    right: u16,
) -> Result<()> {
    for col in left..=right {
        for row in [top, bottom] {
            let mut fmt = Format::new();
            if row == top {
                fmt = fmt.set_border_top(FormatBorder::Medium);
            }
            if row == bottom {
                fmt = fmt.set_border_bottom(FormatBorder::Medium);
            }
            if col == left {
                fmt = fmt.set_border_left(FormatBorder::Medium);
            }
            if col == right {
                fmt = fmt.set_border_right(FormatBorder::Medium);
            }
            ws.write_blank(row, col, &fmt)?;
        }
    }
    for row in (top + 1)..bottom {
        ws.write_blank(row, left, &Format::new().set_border_left(FormatBorder::Medium))?;
        ws.write_blank(row, right, &Format::new().set_border_right(FormatBorder::Medium))?;
    }
    Ok(())
}

fn write_header_block(ws: &mut Worksheet, ctx: &ReportContext, est: &Estilos) -> Result<()> {
    // Sin logo embebido: marcador de texto en F3, como el fallback original.
    ws.write_string_with_format(2, 5, "BIU", &est.titulo)?;
    ws.write_string_with_format(
        2,
        2,
        &format!("Fecha de corte del reporte: {}", ctx.fecha_corte_es()),
        &est.info,
    )?;
    let reporta = if ctx.reporta.is_empty() { "________________" } else { ctx.reporta.as_str() };
    let revisor = if ctx.revisor.is_empty() { "________________" } else { ctx.revisor.as_str() };
    ws.write_string_with_format(3, 2, &format!("Funcionario que reporta: {}", reporta), &est.info)?;
    ws.write_string_with_format(4, 2, &format!("Funcionario revisor: {}", revisor), &est.info)?;
    Ok(())
}

/// Genera el libro de Ravago: hoja "Facturación" con el resumen y hoja
/// "Anexo 1" con el detalle por documento.
pub fn create_ravago_report(ctx: &ReportContext) -> Result<Vec<u8>> {
    let est = Estilos::new();
    let mut workbook = Workbook::new();

    // =========================
    // Hoja 1: Facturación
    // =========================
    {
        let ws = workbook.add_worksheet();
        ws.set_name("Facturación")?;
        ws.set_screen_gridlines(false);

        for (col, width) in [(0, 2.0), (1, 4.0), (2, 38.0), (3, 20.0), (4, 30.0), (5, 16.0), (6, 8.0)] {
            ws.set_column_width(col, width)?;
        }

        write_header_block(ws, ctx, &est)?;

        // Tabla superior: fila 8 cabeceras, 9 valores, 10 total por facturar
        ws.write_string_with_format(7, 2, "Año", &est.cabecera)?;
        ws.write_string_with_format(7, 3, "Mes", &est.cabecera)?;
        ws.write_string_with_format(7, 4, "Documentos Revisados (Ver Anexo 1)", &est.cabecera)?;

        ws.write_string_with_format(8, 2, &ctx.anio, &est.dato_centro)?;
        ws.write_string_with_format(8, 3, &ctx.mes, &est.dato_centro)?;
        ws.write_number_with_format(8, 4, ctx.num_docs as f64, &est.dato_centro)?;

        // C10 queda sin bordes ni relleno
        ws.write_string_with_format(9, 3, "Total Por Facturar", &est.total)?;
        ws.write_number_with_format(9, 4, ctx.num_docs as f64, &est.total)?;

        // Tabla de concepto: filas 12-14
        ws.merge_range(11, 2, 11, 3, "Concepto", &est.cabecera)?;
        ws.write_string_with_format(11, 4, "Total (antes de I.V.A)", &est.cabecera)?;

        ws.merge_range(12, 2, 12, 3, &ctx.concepto_ravago(), &est.dato_izquierda)?;
        ws.write_number_with_format(12, 4, ctx.total_valor, &est.valor_usd)?;

        // C14 también sin bordes
        ws.write_string_with_format(13, 3, "SUBTOTAL", &est.total_derecha)?;
        ws.write_number_with_format(13, 4, ctx.total_valor, &est.total_usd)?;

        ws.merge_range(15, 2, 15, 3, NOTA_TRM, &est.nota)?;
        ws.merge_range(17, 2, 19, 4, NOTA_PIE, &est.nota_cursiva)?;

        // Marco B2:G21
        draw_outer_frame(ws, 1, 20, 1, 6)?;
    }

    // =========================
    // Hoja 2: Anexo 1
    // =========================
    {
        let ws = workbook.add_worksheet();
        ws.set_name("Anexo 1")?;
        ws.set_screen_gridlines(false);

        for (col, width) in [(0, 2.0), (1, 4.0), (2, 12.0), (3, 36.0), (4, 44.0), (5, 16.0), (6, 8.0)] {
            ws.set_column_width(col, width)?;
        }

        write_header_block(ws, ctx, &est)?;
        ws.merge_range(5, 2, 5, 5, "HONORARIOS", &est.titulo)?;

        ws.write_string_with_format(7, 2, "FECHA", &est.cabecera)?;
        ws.write_string_with_format(7, 3, "NOMBRE CONTRAPARTE", &est.cabecera)?;
        ws.write_string_with_format(7, 4, "TIPO DE DOCUMENTO", &est.cabecera)?;
        ws.write_string_with_format(7, 5, "TOTAL", &est.cabecera)?;

        let mut row: u32 = 8;
        for (i, det) in ctx.detalles.iter().enumerate() {
            // FECHA: consecutivo 1, 2, 3, ...
            ws.write_number_with_format(row, 2, (i + 1) as f64, &est.dato_centro)?;
            ws.write_string_with_format(row, 3, &det.nombre, &est.dato_izquierda)?;
            ws.write_string_with_format(row, 4, &det.tipo_documento, &est.dato_izquierda)?;
            ws.write_number_with_format(row, 5, det.valor.unwrap_or(0.0), &est.valor_usd)?;
            row += 1;
        }

        // Fila SUBTOTAL: C y D quedan sin estilo
        ws.write_string_with_format(row, 4, "SUBTOTAL", &est.total_derecha)?;
        ws.write_number_with_format(row, 5, ctx.total_valor, &est.total_usd)?;

        // Marco hasta una fila por debajo del subtotal
        draw_outer_frame(ws, 1, row + 1, 1, 6)?;
    }

    let bytes = workbook.save_to_buffer()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ReportContext, EMPRESA_RAVAGO};
    use crate::table::{Cell, Table};
    use calamine::{DataType, Reader, Xlsx};
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn ravago_context() -> ReportContext {
        let mut t = Table::new(vec![
            "EMPRESA".into(),
            "NOMBRE".into(),
            "TIPO DE DOCUMENTO".into(),
            "VALOR".into(),
            "NO. CASO".into(),
        ]);
        for (nombre, valor, caso) in [("Acme", 100.0, "C-1"), ("Beta", 200.0, "C-2"), ("Gamma", 100.0, "C-3")] {
            t.rows.push(vec![
                Cell::Text(EMPRESA_RAVAGO.into()),
                Cell::Text(nombre.into()),
                Cell::Text("Contrato".into()),
                Cell::Number(valor),
                Cell::Text(caso.into()),
            ]);
        }
        ReportContext::build(
            &t,
            EMPRESA_RAVAGO,
            "2024",
            "Mayo",
            "",
            "",
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        )
    }

    #[test]
    fn workbook_has_both_sheets_and_subtotal() {
        let bytes = create_ravago_report(&ravago_context()).unwrap();
        let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let names = wb.sheet_names().to_vec();
        assert_eq!(names, vec!["Facturación", "Anexo 1"]);

        let fact = wb.worksheet_range("Facturación").unwrap().unwrap();
        // E13: suma de VALOR sobre las filas filtradas
        assert_eq!(fact.get_value((12, 4)), Some(&DataType::Float(400.0)));
        // E14: subtotal repetido
        assert_eq!(fact.get_value((13, 4)), Some(&DataType::Float(400.0)));
        // E9/E10: cuenta de documentos
        assert_eq!(fact.get_value((8, 4)), Some(&DataType::Float(3.0)));
        assert_eq!(fact.get_value((9, 4)), Some(&DataType::Float(3.0)));
    }

    #[test]
    fn anexo_has_detail_rows_plus_subtotal() {
        let bytes = create_ravago_report(&ravago_context()).unwrap();
        let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let anexo = wb.worksheet_range("Anexo 1").unwrap().unwrap();

        // tres filas de detalle con consecutivo 1..3
        for i in 0..3u32 {
            assert_eq!(
                anexo.get_value((8 + i, 2)),
                Some(&DataType::Float((i + 1) as f64))
            );
        }
        // fila de subtotal a continuación
        assert_eq!(
            anexo.get_value((11, 4)),
            Some(&DataType::String("SUBTOTAL".to_string()))
        );
        assert_eq!(anexo.get_value((11, 5)), Some(&DataType::Float(400.0)));
    }
}
