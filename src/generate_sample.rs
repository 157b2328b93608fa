use anyhow::Result;
use clap::Parser;
use rust_xlsxwriter::Workbook;

/// Genera un libro de ejemplo con la estructura de columnas que espera el
/// generador de reportes, con filas para las tres empresas de prueba.
#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Genera un archivo de Excel de ejemplo para pruebas")]
struct Cli {
    /// Ruta del archivo de salida
    #[arg(short, long, default_value = "ejemplo.xlsx")]
    output: String,
    /// Filas adicionales de Ravago por mes
    #[arg(long, default_value_t = 5)]
    casos: u32,
}

const HEADERS: [&str; 10] = [
    "EMPRESA",
    "AÑO ASIGNACION",
    "MES ASIGNACION",
    "FECHA ASIGNACION",
    "FECHA ENTREGA",
    "NO. CASO",
    "NOMBRE",
    "TIPO DE DOCUMENTO",
    "MONEDA",
    "VALOR",
];

struct Fila {
    empresa: &'static str,
    anio: f64,
    mes: &'static str,
    fecha_asignacion: &'static str,
    fecha_entrega: &'static str,
    caso: String,
    nombre: String,
    tipo: &'static str,
    valor: f64,
}

fn filas(casos: u32) -> Vec<Fila> {
    let mut filas = Vec::new();

    // Ravago: un caso por documento revisado, todos al mismo valor.
    for i in 0..casos {
        filas.push(Fila {
            empresa: "Ravago Americas LLC",
            anio: 2024.0,
            mes: "Mayo",
            fecha_asignacion: "2024-05-02",
            fecha_entrega: "2024-05-10",
            caso: format!("RAV-{:04}", i + 1),
            nombre: format!("Documento contractual {}", i + 1),
            tipo: "Contrato",
            valor: 400.0,
        });
    }

    // Gwealth: consultas con el mismo precio repetido (la moda) y un valor
    // atípico, para ejercitar la regla del precio único.
    for (i, valor) in [50.0, 50.0, 50.0, 75.0].iter().enumerate() {
        filas.push(Fila {
            empresa: "Gwealth",
            anio: 2024.0,
            mes: "Mayo",
            fecha_asignacion: "2024-05-03",
            fecha_entrega: "2024-05-06",
            caso: format!("GW-{:04}", i + 1),
            nombre: format!("Consulta en listas {}", i + 1),
            tipo: "Consulta",
            valor: *valor,
        });
    }

    // Altimetrik: resumen simple por suma.
    for i in 0..3u32 {
        filas.push(Fila {
            empresa: "Altimetrik",
            anio: 2024.0,
            mes: "Junio",
            fecha_asignacion: "2024-06-04",
            fecha_entrega: "2024-06-12",
            caso: format!("ALT-{:04}", i + 1),
            nombre: format!("Consulta en listas {}", i + 1),
            tipo: "Consulta",
            valor: 120.0,
        });
    }

    filas
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, fila) in filas(cli.casos).iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, fila.empresa)?;
        worksheet.write_number(row, 1, fila.anio)?;
        worksheet.write_string(row, 2, fila.mes)?;
        worksheet.write_string(row, 3, fila.fecha_asignacion)?;
        worksheet.write_string(row, 4, fila.fecha_entrega)?;
        worksheet.write_string(row, 5, &fila.caso)?;
        worksheet.write_string(row, 6, &fila.nombre)?;
        worksheet.write_string(row, 7, fila.tipo)?;
        worksheet.write_string(row, 8, "USD")?;
        worksheet.write_number(row, 9, fila.valor)?;
    }

    workbook.save(&cli.output)?;
    println!("Archivo de ejemplo escrito en {}", cli.output);
    Ok(())
}
