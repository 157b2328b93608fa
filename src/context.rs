use chrono::{Datelike, NaiveDate};

use crate::table::Table;

/// Empresa reservada: la única que produce Excel en lugar de Word.
pub const EMPRESA_RAVAGO: &str = "Ravago Americas LLC";
pub const EMPRESA_GWEALTH: &str = "Gwealth";
pub const EMPRESA_ALTIMETRIK: &str = "Altimetrik";

/// Tasa de IVA aplicada en el resumen de Gwealth.
pub const TASA_IVA: f64 = 0.19;

/// Meses en minúscula para fechas en español.
pub const MESES_ES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

const CANDIDATOS_CASO: [&str; 6] = ["NO. CASO", "NUMERO CASO", "CASO", "ID", "NUMERO", "DOCUMENTO"];
const CANDIDATOS_VALOR: [&str; 4] = ["VALOR", "TOTAL", "IMPORTE", "MONTO"];

/// Columnas de la tabla principal del reporte Word, en su orden fijo.
pub const COLUMNAS_PRINCIPALES: [&str; 5] =
    ["MES ASIGNACION", "AÑO ASIGNACION", "NOMBRE", "MONEDA", "VALOR"];

/// 'dd de <mes> de yyyy' en español.
pub fn fecha_es(fecha: NaiveDate) -> String {
    format!(
        "{:02} de {} de {}",
        fecha.day(),
        MESES_ES[fecha.month0() as usize],
        fecha.year()
    )
}

/// "USD 1,234.50": separador de miles y dos decimales. Valores no finitos
/// degradan a cero en lugar de fallar.
pub fn format_currency(value: f64) -> String {
    let v = if value.is_finite() { value } else { 0.0 };
    let negative = v < 0.0;
    let s = format!("{:.2}", v.abs());
    let (int_part, dec_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();

    let sign = if negative { "-" } else { "" };
    format!("USD {}{}.{}", sign, grouped, dec_part)
}

/// Igual que [`format_currency`] pero sin el prefijo de moneda, para las
/// celdas de valor de la tabla principal.
pub fn format_amount(value: f64) -> String {
    format_currency(value)
        .trim_start_matches("USD ")
        .to_string()
}

/// Fila de detalle para la hoja Anexo y la tabla principal del Word.
#[derive(Debug, Clone)]
pub struct DetailRow {
    pub mes: String,
    pub anio: String,
    pub nombre: String,
    pub moneda: String,
    pub tipo_documento: String,
    pub valor: Option<f64>,
}

/// Agregados compartidos por los tres renderizadores (Excel, Word y la
/// previsualización HTML). Se construye una sola vez por selección filtrada.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub empresa: String,
    pub anio: String,
    pub mes: String,
    pub reporta: String,
    pub revisor: String,
    pub fecha_corte: NaiveDate,
    /// Documentos únicos según la columna identificadora; si no hay
    /// ninguna columna conocida, cuenta de filas.
    pub num_docs: usize,
    /// Suma de la columna VALOR sobre las filas filtradas.
    pub total_valor: f64,
    /// Moda de VALOR: la regla de facturación propia de Gwealth.
    pub precio_unico: f64,
    pub detalles: Vec<DetailRow>,
    /// Subconjunto de [`COLUMNAS_PRINCIPALES`] presente en los datos.
    pub columnas_principales: Vec<String>,
}

impl ReportContext {
    pub fn build(
        data: &Table,
        empresa: &str,
        anio: &str,
        mes: &str,
        reporta: &str,
        revisor: &str,
        fecha_corte: NaiveDate,
    ) -> ReportContext {
        ReportContext {
            empresa: empresa.to_string(),
            anio: anio.to_string(),
            mes: mes.to_string(),
            reporta: reporta.to_string(),
            revisor: revisor.to_string(),
            fecha_corte,
            num_docs: document_count(data),
            total_valor: total_valor(data),
            precio_unico: representative_price(data),
            detalles: detail_rows(data),
            columnas_principales: COLUMNAS_PRINCIPALES
                .iter()
                .filter(|c| data.column_index(c).is_some())
                .map(|c| c.to_string())
                .collect(),
        }
    }

    pub fn is_ravago(&self) -> bool {
        self.empresa == EMPRESA_RAVAGO
    }

    pub fn is_gwealth(&self) -> bool {
        self.empresa == EMPRESA_GWEALTH
    }

    pub fn iva(&self) -> f64 {
        self.precio_unico * TASA_IVA
    }

    pub fn total_con_iva(&self) -> f64 {
        self.precio_unico + self.iva()
    }

    /// Total de la fila final de la tabla principal: para Gwealth el precio
    /// único (moda), para las demás la suma.
    pub fn total_tabla_principal(&self) -> f64 {
        if self.is_gwealth() { self.precio_unico } else { self.total_valor }
    }

    pub fn fecha_corte_es(&self) -> String {
        fecha_es(self.fecha_corte)
    }

    /// Frase del concepto en la hoja de facturación de Ravago.
    pub fn concepto_ravago(&self) -> String {
        format!(
            "Revisión de {} documentos durante el mes de {} de {}",
            self.num_docs, self.mes, self.anio
        )
    }

    /// Frase del concepto en los resúmenes de Altimetrik y Gwealth.
    pub fn concepto_consultas(&self) -> String {
        format!("Consultas en listas recibidas en {} de {}", self.mes, self.anio)
    }
}

/// Documentos únicos por la columna identificadora; cuenta de filas si no
/// hay coincidencia de nombre. Nunca falla.
pub fn document_count(data: &Table) -> usize {
    match data.find_column(&CANDIDATOS_CASO) {
        Some(idx) => data.unique_values(idx).len(),
        None => data.len(),
    }
}

fn valor_column(data: &Table) -> Option<usize> {
    data.column_index("VALOR")
        .or_else(|| data.find_column(&CANDIDATOS_VALOR))
}

/// Suma de VALOR; las celdas no numéricas cuentan como cero.
pub fn total_valor(data: &Table) -> f64 {
    let Some(idx) = valor_column(data) else { return 0.0 };
    data.rows
        .iter()
        .map(|row| row.get(idx).and_then(|c| c.as_number()).unwrap_or(0.0))
        .sum()
}

/// Precio representativo: moda de los VALOR numéricos. En caso de empate
/// gana el menor; si no hay moda, el primer valor no vacío; 0.0 sin datos.
pub fn representative_price(data: &Table) -> f64 {
    let Some(idx) = valor_column(data) else { return 0.0 };
    let values: Vec<f64> = data
        .rows
        .iter()
        .filter_map(|row| row.get(idx).and_then(|c| c.as_number()))
        .collect();
    if values.is_empty() {
        return 0.0;
    }

    let mut best: Option<(f64, usize)> = None;
    for &v in &values {
        let count = values.iter().filter(|&&w| w == v).count();
        best = match best {
            None => Some((v, count)),
            Some((bv, bc)) => {
                if count > bc || (count == bc && v < bv) {
                    Some((v, count))
                } else {
                    Some((bv, bc))
                }
            }
        };
    }
    best.map(|(v, _)| v).unwrap_or(values[0])
}

fn detail_rows(data: &Table) -> Vec<DetailRow> {
    let mes_idx = data.column_index("MES ASIGNACION");
    let anio_idx = data.column_index("AÑO ASIGNACION");
    let moneda_idx = data.column_index("MONEDA");
    let nombre_idx = data.find_column(&["NOMBRE", "NOMBRE CONTRAPARTE", "CLIENTE"]);
    let tipo_idx = data.find_column(&["TIPO DE DOCUMENTO", "TIPO DOCUMENTO", "DOCUMENTO"]);
    let valor_idx = valor_column(data);

    let text_at = |row: &[crate::table::Cell], idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).map(|c| c.display()).unwrap_or_default()
    };

    data.rows
        .iter()
        .map(|row| DetailRow {
            mes: text_at(row, mes_idx),
            anio: text_at(row, anio_idx),
            nombre: text_at(row, nombre_idx),
            moneda: text_at(row, moneda_idx),
            tipo_documento: text_at(row, tipo_idx),
            valor: valor_idx.and_then(|i| row.get(i)).and_then(|c| c.as_number()),
        })
        .collect()
}
