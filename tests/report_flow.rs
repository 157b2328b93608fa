//! Flujo completo: libro de Excel en memoria -> carga -> filtros ->
//! contexto -> reporte generado, verificado leyendo el artefacto de vuelta.

use std::io::Cursor;

use calamine::{Reader, Xlsx};
use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;

use facturador::{
    create_report, filter_options, filter_table, final_filename, load_workbooks, ReportContext,
    MIME_DOCX, MIME_XLSX,
};

const HEADERS: [&str; 7] = [
    "EMPRESA",
    "AÑO ASIGNACION",
    "MES ASIGNACION",
    "NO. CASO",
    "NOMBRE",
    "MONEDA",
    "VALOR",
];

struct Fila<'a> {
    empresa: &'a str,
    anio: f64,
    mes: &'a str,
    caso: &'a str,
    nombre: &'a str,
    valor: f64,
}

fn workbook_bytes(filas: &[Fila]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    for (col, h) in HEADERS.iter().enumerate() {
        ws.write_string(0, col as u16, *h).unwrap();
    }
    for (i, f) in filas.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, f.empresa).unwrap();
        ws.write_number(row, 1, f.anio).unwrap();
        ws.write_string(row, 2, f.mes).unwrap();
        ws.write_string(row, 3, f.caso).unwrap();
        ws.write_string(row, 4, f.nombre).unwrap();
        ws.write_string(row, 5, "USD").unwrap();
        ws.write_number(row, 6, f.valor).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

fn filas_mixtas() -> Vec<Fila<'static>> {
    vec![
        Fila { empresa: "Ravago Americas LLC", anio: 2024.0, mes: "Mayo", caso: "RAV-1", nombre: "Contrato A", valor: 400.0 },
        Fila { empresa: "Ravago Americas LLC", anio: 2024.0, mes: "Mayo", caso: "RAV-2", nombre: "Contrato B", valor: 400.0 },
        Fila { empresa: "Ravago Americas LLC", anio: 2024.0, mes: "Mayo", caso: "RAV-3", nombre: "Contrato C", valor: 400.0 },
        Fila { empresa: "Gwealth", anio: 2024.0, mes: "Mayo", caso: "GW-1", nombre: "Consulta 1", valor: 50.0 },
        Fila { empresa: "Gwealth", anio: 2024.0, mes: "Mayo", caso: "GW-2", nombre: "Consulta 2", valor: 50.0 },
        Fila { empresa: "Gwealth", anio: 2024.0, mes: "Mayo", caso: "GW-3", nombre: "Consulta 3", valor: 75.0 },
        Fila { empresa: "Altimetrik", anio: 2024.0, mes: "Junio", caso: "ALT-1", nombre: "Consulta 4", valor: 120.0 },
        Fila { empresa: "Altimetrik", anio: 2024.0, mes: "Junio", caso: "ALT-2", nombre: "Consulta 5", valor: 120.0 },
    ]
}

fn corte() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
}

#[test]
fn cargar_filtrar_y_generar_reporte_ravago() {
    let bytes = workbook_bytes(&filas_mixtas());
    let (table, warnings) = load_workbooks(&[("datos.xlsx".to_string(), bytes)]);
    assert!(warnings.is_empty(), "{:?}", warnings);
    assert_eq!(table.len(), 8);

    let filtered = filter_table(&table, "Ravago Americas LLC", "2024", "Mayo");
    assert_eq!(filtered.len(), 3);

    let ctx = ReportContext::build(
        &filtered,
        "Ravago Americas LLC",
        "2024",
        "Mayo",
        "Ana Pérez",
        "Luis Gómez",
        corte(),
    );
    assert_eq!(ctx.num_docs, 3);
    assert_eq!(ctx.total_valor, 1200.0);

    let (report, mime) = create_report(&ctx).unwrap();
    assert_eq!(mime, MIME_XLSX);

    let mut libro: Xlsx<_> = Xlsx::new(Cursor::new(report)).unwrap();
    let nombres = libro.sheet_names().to_vec();
    assert_eq!(nombres, vec!["Facturación".to_string(), "Anexo 1".to_string()]);

    // El total y el concepto aparecen en la hoja de facturación.
    let hoja = libro.worksheet_range("Facturación").unwrap().unwrap();
    let tiene_total = hoja
        .used_cells()
        .any(|(_, _, v)| v.get_float() == Some(1200.0));
    assert!(tiene_total, "no se encontró el total 1200");
    let tiene_concepto = hoja.used_cells().any(|(_, _, v)| {
        v.get_string()
            .map(|s| s.contains("Revisión de 3 documentos"))
            .unwrap_or(false)
    });
    assert!(tiene_concepto);

    // El anexo lista los tres documentos revisados.
    let anexo = libro.worksheet_range("Anexo 1").unwrap().unwrap();
    for nombre in ["Contrato A", "Contrato B", "Contrato C"] {
        let presente = anexo
            .used_cells()
            .any(|(_, _, v)| v.get_string() == Some(nombre));
        assert!(presente, "falta {} en el anexo", nombre);
    }
}

#[test]
fn gwealth_usa_precio_unico_con_iva() {
    let bytes = workbook_bytes(&filas_mixtas());
    let (table, _) = load_workbooks(&[("datos.xlsx".to_string(), bytes)]);
    let filtered = filter_table(&table, "Gwealth", "2024", "Mayo");
    assert_eq!(filtered.len(), 3);

    let ctx = ReportContext::build(&filtered, "Gwealth", "2024", "Mayo", "", "", corte());
    assert_eq!(ctx.precio_unico, 50.0);
    assert!((ctx.total_con_iva() - 59.50).abs() < 1e-9);

    let (report, mime) = create_report(&ctx).unwrap();
    assert_eq!(mime, MIME_DOCX);
    assert_eq!(&report[..2], b"PK");
}

#[test]
fn opciones_se_estrechan_por_empresa_y_anio() {
    let bytes = workbook_bytes(&filas_mixtas());
    let (table, _) = load_workbooks(&[("datos.xlsx".to_string(), bytes)]);

    let todas = filter_options(&table, None, None);
    assert!(todas.empresas.contains(&"Ravago Americas LLC".to_string()));
    assert!(todas.empresas.contains(&"Gwealth".to_string()));
    assert!(todas.meses.contains(&"Mayo".to_string()));
    assert!(todas.meses.contains(&"Junio".to_string()));

    let alti = filter_options(&table, Some("Altimetrik"), Some("2024"));
    assert_eq!(alti.anios, vec!["Todos".to_string(), "2024".to_string()]);
    assert_eq!(alti.meses, vec!["Todos".to_string(), "Junio".to_string()]);
}

#[test]
fn combinacion_de_varios_archivos_une_columnas() {
    let todas = filas_mixtas();
    let a = workbook_bytes(&todas[..2]);
    let b = workbook_bytes(&todas[3..5]);
    let (table, warnings) = load_workbooks(&[
        ("a.xlsx".to_string(), a),
        ("b.xlsx".to_string(), b),
    ]);
    assert!(warnings.is_empty());
    assert_eq!(table.len(), 4);

    // Un archivo corrupto produce aviso pero no descarta el resto.
    let (table, warnings) = load_workbooks(&[
        ("a.xlsx".to_string(), workbook_bytes(&filas_mixtas())),
        ("roto.xlsx".to_string(), vec![0, 1, 2, 3]),
    ]);
    assert_eq!(table.len(), 8);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("roto.xlsx"));
}

#[test]
fn nombre_final_del_archivo() {
    let sugerido = "240531-LV-Gwealth-Facturación honorarios.docx";
    assert_eq!(
        final_filename("", sugerido, "Gwealth"),
        "240531-LV-Gwealth-Facturacion-honorarios.docx"
    );
    assert_eq!(
        final_filename("reporte mayo", sugerido, "Ravago Americas LLC"),
        "reporte-mayo.xlsx"
    );
}
