use anyhow::{Context, Result};
use calamine::{DataType, Reader, Xls, Xlsx};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::io::Cursor;

/// Sentinel que desactiva el filtro de empresa.
pub const TODAS: &str = "Todas";
/// Sentinel que desactiva los filtros de año y mes.
pub const TODOS: &str = "Todos";

/// Meses en orden calendario, tal como aparecen en la columna MES ASIGNACION.
pub const MESES_ORDENADOS: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio",
    "Julio", "Agosto", "Septiembre", "Octubre", "Noviembre", "Diciembre",
];

const COLUMNAS_FECHA: [&str; 2] = ["FECHA ASIGNACION", "FECHA ENTREGA"];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Representación textual usada para filtrar y para pintar tablas.
    /// Los números sin parte decimal se muestran como enteros (los años
    /// llegan como flotantes desde Excel).
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn from_data(cell: &DataType) -> Cell {
        match cell {
            DataType::Empty => Cell::Empty,
            DataType::String(s) => {
                let t = s.trim();
                if t.is_empty() { Cell::Empty } else { Cell::Text(t.to_string()) }
            }
            DataType::Float(f) => Cell::Number(*f),
            DataType::Int(i) => Cell::Number(*i as f64),
            DataType::Bool(b) => Cell::Text(b.to_string()),
            DataType::DateTime(serial) => match serial_to_date(*serial) {
                Some(d) => Cell::Date(d),
                None => Cell::Empty,
            },
            _ => Cell::Empty,
        }
    }
}

/// Fechas de Excel: días desde 1899-12-30.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial as i64))
}

/// Tabla combinada de registros. Conserva todas las columnas de los archivos
/// de origen; la unión de columnas se resuelve al concatenar.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table { headers, rows: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Índice de columna por nombre exacto.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Búsqueda difusa: primera columna cuyo nombre contiene alguno de los
    /// candidatos, sin distinguir mayúsculas. El orden de los candidatos
    /// define la prioridad.
    pub fn find_column(&self, possible_names: &[&str]) -> Option<usize> {
        for cand in possible_names {
            let cand_up = cand.to_uppercase();
            if let Some(idx) = self
                .headers
                .iter()
                .position(|h| h.to_uppercase().contains(&cand_up))
            {
                return Some(idx);
            }
        }
        None
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    /// Valores distintos (por representación textual, sin vacíos) de una columna.
    pub fn unique_values(&self, col: usize) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for row in &self.rows {
            if let Some(cell) = row.get(col) {
                if cell.is_empty() {
                    continue;
                }
                let v = cell.display();
                if !seen.contains(&v) {
                    seen.push(v);
                }
            }
        }
        seen
    }

    /// Lee la primera hoja de un libro .xlsx/.xls a partir de sus bytes.
    /// La primera fila es la cabecera.
    pub fn from_workbook_bytes(name: &str, bytes: &[u8]) -> Result<Table> {
        let lower = name.to_lowercase();
        let range = if lower.ends_with(".xls") {
            let mut wb: Xls<_> = Xls::new(Cursor::new(bytes))
                .with_context(|| format!("no se pudo abrir el archivo {}", name))?;
            let sheet = wb
                .sheet_names()
                .first()
                .cloned()
                .with_context(|| format!("{} no contiene hojas", name))?;
            wb.worksheet_range(&sheet)
                .with_context(|| format!("no se pudo leer la hoja {}", sheet))??
        } else {
            let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
                .with_context(|| format!("no se pudo abrir el archivo {}", name))?;
            let sheet = wb
                .sheet_names()
                .first()
                .cloned()
                .with_context(|| format!("{} no contiene hojas", name))?;
            wb.worksheet_range(&sheet)
                .with_context(|| format!("no se pudo leer la hoja {}", sheet))??
        };

        let mut rows_iter = range.rows();
        let header_row = rows_iter
            .next()
            .with_context(|| format!("{} no tiene fila de cabecera", name))?;
        let headers: Vec<String> = header_row.iter().map(|c| c.to_string().trim().to_string()).collect();

        let mut table = Table::new(headers);
        for row in rows_iter {
            let mut cells: Vec<Cell> = row.iter().map(Cell::from_data).collect();
            cells.resize(table.headers.len(), Cell::Empty);
            if cells.iter().all(Cell::is_empty) {
                continue;
            }
            table.rows.push(cells);
        }
        Ok(table)
    }
}

/// Carga varios archivos subidos y los combina en una sola tabla.
/// Un archivo ilegible se omite con una advertencia, nunca aborta la carga.
pub fn load_workbooks(files: &[(String, Vec<u8>)]) -> (Table, Vec<String>) {
    let mut warnings = Vec::new();
    let mut loaded = Vec::new();

    for (name, bytes) in files {
        match Table::from_workbook_bytes(name, bytes) {
            Ok(t) => loaded.push(t),
            Err(e) => warnings.push(format!("Error al leer el archivo {}: {:#}", name, e)),
        }
    }

    if loaded.is_empty() {
        return (Table::default(), warnings);
    }

    let mut combined = concat_tables(loaded);
    coerce_date_columns(&mut combined);
    (combined, warnings)
}

/// Concatena por unión de columnas; las columnas ausentes quedan vacías.
pub fn concat_tables(tables: Vec<Table>) -> Table {
    let mut headers: Vec<String> = Vec::new();
    for t in &tables {
        for h in &t.headers {
            if !headers.contains(h) {
                headers.push(h.clone());
            }
        }
    }

    let mut combined = Table::new(headers);
    for t in tables {
        // posición de cada columna de origen en la tabla combinada
        let mapping: Vec<usize> = t
            .headers
            .iter()
            .map(|h| combined.headers.iter().position(|c| c == h).unwrap_or(usize::MAX))
            .collect();
        for row in t.rows {
            let mut cells = vec![Cell::Empty; combined.headers.len()];
            for (src_idx, cell) in row.into_iter().enumerate() {
                if let Some(&dst) = mapping.get(src_idx) {
                    if dst != usize::MAX {
                        cells[dst] = cell;
                    }
                }
            }
            combined.rows.push(cells);
        }
    }
    combined
}

/// Convierte las columnas de fecha conocidas; los valores que no se pueden
/// interpretar quedan vacíos en lugar de fallar.
fn coerce_date_columns(table: &mut Table) {
    for col_name in COLUMNAS_FECHA {
        let Some(idx) = table.column_index(col_name) else { continue };
        for row in &mut table.rows {
            let Some(cell) = row.get_mut(idx) else { continue };
            *cell = match &*cell {
                Cell::Date(d) => Cell::Date(*d),
                Cell::Number(serial) => match serial_to_date(*serial) {
                    Some(d) => Cell::Date(d),
                    None => Cell::Empty,
                },
                Cell::Text(s) => match parse_date_text(s) {
                    Some(d) => Cell::Date(d),
                    None => Cell::Empty,
                },
                Cell::Empty => Cell::Empty,
            };
        }
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    // valores con componente horario, p. ej. "2024-05-03 00:00:00"
    if let Some((date_part, _)) = t.split_once(' ') {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Some(d);
        }
    }
    None
}

/// Filtra por empresa, año y mes de asignación. Los sentinels "Todas"/"Todos"
/// (o cadena vacía) desactivan el eje correspondiente.
pub fn filter_table(table: &Table, empresa: &str, anio: &str, mes: &str) -> Table {
    if table.is_empty() {
        return Table::default();
    }

    let empresa_idx = table.column_index("EMPRESA");
    let anio_idx = table.column_index("AÑO ASIGNACION");
    let mes_idx = table.column_index("MES ASIGNACION");

    let mut filtered = Table::new(table.headers.clone());
    for row in &table.rows {
        let matches = |sel: &str, sentinel: &str, idx: Option<usize>| -> bool {
            if sel.is_empty() || sel == sentinel {
                return true;
            }
            match idx {
                Some(i) => row.get(i).map(|c| c.display()) == Some(sel.to_string()),
                None => false,
            }
        };
        if matches(empresa, TODAS, empresa_idx)
            && matches(anio, TODOS, anio_idx)
            && matches(mes, TODOS, mes_idx)
        {
            filtered.rows.push(row.clone());
        }
    }
    filtered
}

/// Opciones disponibles para los selectores de filtro.
#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub empresas: Vec<String>,
    pub anios: Vec<String>,
    pub meses: Vec<String>,
}

/// Calcula las opciones de los selectores con estrechamiento monótono:
/// elegir empresa restringe los años a los de esa empresa, y elegir año
/// restringe los meses a los presentes en ese año.
pub fn filter_options(table: &Table, empresa: Option<&str>, anio: Option<&str>) -> FilterOptions {
    if table.is_empty() {
        return FilterOptions {
            empresas: vec![TODAS.to_string()],
            anios: vec![TODOS.to_string()],
            meses: vec![TODOS.to_string()],
        };
    }

    let mut empresas = match table.column_index("EMPRESA") {
        Some(idx) => table.unique_values(idx),
        None => Vec::new(),
    };
    empresas.sort();

    let mut scope = table.clone();
    if let Some(emp) = empresa {
        if emp != TODAS && !emp.is_empty() {
            scope = filter_table(&scope, emp, TODOS, TODOS);
        }
    }

    let mut anios = match scope.column_index("AÑO ASIGNACION") {
        Some(idx) => scope.unique_values(idx),
        None => Vec::new(),
    };
    anios.sort();
    anios.reverse();

    if let Some(a) = anio {
        if a != TODOS && !a.is_empty() {
            scope = filter_table(&scope, TODAS, a, TODOS);
        }
    }

    let disponibles = match scope.column_index("MES ASIGNACION") {
        Some(idx) => scope.unique_values(idx),
        None => Vec::new(),
    };
    let meses: Vec<String> = MESES_ORDENADOS
        .iter()
        .filter(|m| disponibles.iter().any(|d| d == *m))
        .map(|m| m.to_string())
        .collect();

    let mut all_empresas = vec![TODAS.to_string()];
    all_empresas.extend(empresas);
    let mut all_anios = vec![TODOS.to_string()];
    all_anios.extend(anios);
    let mut all_meses = vec![TODOS.to_string()];
    all_meses.extend(meses);

    FilterOptions {
        empresas: all_empresas,
        anios: all_anios,
        meses: all_meses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_table() -> Table {
        let mut t = Table::new(
            ["EMPRESA", "AÑO ASIGNACION", "MES ASIGNACION", "NOMBRE", "MONEDA", "VALOR", "NO. CASO"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let mk = |emp: &str, anio: f64, mes: &str, nombre: &str, valor: f64, caso: &str| {
            vec![
                Cell::Text(emp.to_string()),
                Cell::Number(anio),
                Cell::Text(mes.to_string()),
                Cell::Text(nombre.to_string()),
                Cell::Text("USD".to_string()),
                Cell::Number(valor),
                Cell::Text(caso.to_string()),
            ]
        };
        t.rows.push(mk("Ravago Americas LLC", 2024.0, "Mayo", "Acme", 100.0, "C-1"));
        t.rows.push(mk("Ravago Americas LLC", 2024.0, "Mayo", "Beta", 200.0, "C-2"));
        t.rows.push(mk("Ravago Americas LLC", 2024.0, "Junio", "Gamma", 100.0, "C-3"));
        t.rows.push(mk("Gwealth", 2024.0, "Mayo", "Delta", 50.0, "C-4"));
        t.rows.push(mk("Gwealth", 2023.0, "Enero", "Eps", 75.0, "C-5"));
        t
    }

    #[test]
    fn concat_union_of_columns() {
        let mut a = Table::new(vec!["EMPRESA".into(), "VALOR".into()]);
        a.rows.push(vec![Cell::Text("X".into()), Cell::Number(1.0)]);
        let mut b = Table::new(vec!["EMPRESA".into(), "NOMBRE".into()]);
        b.rows.push(vec![Cell::Text("Y".into()), Cell::Text("n".into())]);

        let c = concat_tables(vec![a, b]);
        assert_eq!(c.headers, vec!["EMPRESA", "VALOR", "NOMBRE"]);
        assert_eq!(c.len(), 2);
        // columna ausente en el segundo archivo queda vacía
        assert!(c.cell(1, 1).is_empty());
        assert_eq!(c.cell(1, 2).display(), "n");
    }

    #[test]
    fn filter_all_sentinels_is_identity() {
        let t = sample_table();
        let f = filter_table(&t, TODAS, TODOS, TODOS);
        assert_eq!(f.len(), t.len());
    }

    #[test]
    fn filter_is_idempotent() {
        let t = sample_table();
        let once = filter_table(&t, "Gwealth", "2024", "Mayo");
        let twice = filter_table(&once, "Gwealth", "2024", "Mayo");
        assert_eq!(once.len(), 1);
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn filter_empty_table() {
        let f = filter_table(&Table::default(), "Gwealth", "2024", "Mayo");
        assert!(f.is_empty());
    }

    #[test]
    fn year_matches_numeric_cells() {
        let t = sample_table();
        let f = filter_table(&t, "Gwealth", "2023", TODOS);
        assert_eq!(f.len(), 1);
        assert_eq!(f.cell(0, 3).display(), "Eps");
    }

    #[test]
    fn options_narrow_by_empresa_and_anio() {
        let t = sample_table();

        let base = filter_options(&t, None, None);
        assert_eq!(base.empresas[0], TODAS);
        assert!(base.empresas.contains(&"Gwealth".to_string()));
        // años en orden descendente
        assert_eq!(base.anios, vec!["Todos", "2024", "2023"]);

        let narrowed = filter_options(&t, Some("Ravago Americas LLC"), None);
        assert_eq!(narrowed.anios, vec!["Todos", "2024"]);
        // meses en orden calendario, solo los presentes
        assert_eq!(narrowed.meses, vec!["Todos", "Mayo", "Junio"]);

        let by_year = filter_options(&t, Some("Gwealth"), Some("2023"));
        assert_eq!(by_year.meses, vec!["Todos", "Enero"]);
    }

    #[test]
    fn fuzzy_column_lookup() {
        let t = sample_table();
        assert_eq!(t.find_column(&["NO. CASO", "NUMERO CASO"]), Some(6));
        assert_eq!(t.find_column(&["INEXISTENTE"]), None);
        // coincidencia por subcadena sin distinguir mayúsculas
        assert_eq!(t.find_column(&["caso"]), Some(6));
    }

    #[test]
    fn integral_numbers_display_without_decimals() {
        assert_eq!(Cell::Number(2024.0).display(), "2024");
        assert_eq!(Cell::Number(10.5).display(), "10.5");
    }

    #[test]
    fn date_text_parsing() {
        assert_eq!(
            parse_date_text("2024-05-03"),
            NaiveDate::from_ymd_opt(2024, 5, 3)
        );
        assert_eq!(
            parse_date_text("03/05/2024"),
            NaiveDate::from_ymd_opt(2024, 5, 3)
        );
        assert_eq!(parse_date_text("no es fecha"), None);
    }
}
