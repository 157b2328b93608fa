use chrono::NaiveDate;

use crate::context::EMPRESA_RAVAGO;

/// Equivalente ASCII de un carácter acentuado del español (y vecinos
/// frecuentes en razones sociales). Los demás caracteres no ASCII se
/// descartan, igual que una normalización NFKD seguida de un filtro ASCII.
fn strip_accent(ch: char) -> Option<char> {
    let out = match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        c if c.is_ascii() => c,
        _ => return None,
    };
    Some(out)
}

/// Slug de empresa para el nombre de archivo: solo alfanuméricos ASCII.
pub fn slug_empresa(nombre: &str) -> String {
    nombre
        .chars()
        .filter_map(strip_accent)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Nombre seguro de archivo: sin tildes, espacios como guiones y solo
/// `[A-Za-z0-9-._]`. Si no sobrevive nada, "archivo".
pub fn safe_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter_map(strip_accent)
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        .collect();
    if kept.is_empty() {
        "archivo".to_string()
    } else {
        kept
    }
}

/// Garantiza la extensión indicada (insensible a mayúsculas).
pub fn ensure_extension(name: &str, ext: &str) -> String {
    let ext = if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    };
    if name.to_lowercase().ends_with(&ext.to_lowercase()) {
        name.to_string()
    } else {
        format!("{}{}", name, ext)
    }
}

/// Extensión del artefacto según la empresa seleccionada.
pub fn report_extension(empresa: &str) -> &'static str {
    if empresa == EMPRESA_RAVAGO { ".xlsx" } else { ".docx" }
}

/// Nombre sugerido: "<YYMMDD>-LV-<slug>-Facturación honorarios.<ext>".
pub fn build_report_filename(empresa: &str, fecha: NaiveDate) -> String {
    let date_tag = fecha.format("%y%m%d");
    format!(
        "{}-LV-{}-Facturación honorarios{}",
        date_tag,
        slug_empresa(empresa),
        report_extension(empresa)
    )
}

/// Sanea el nombre elegido por el usuario y fuerza la extensión correcta.
pub fn final_filename(raw: &str, suggested: &str, empresa: &str) -> String {
    let base = raw.trim();
    let base = if base.is_empty() { suggested } else { base };
    ensure_extension(&safe_filename(base), report_extension(empresa))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_strips_accents_and_symbols() {
        assert_eq!(slug_empresa("Café Ñandú S.A."), "CafeNanduSA");
        assert_eq!(slug_empresa("Gwealth"), "Gwealth");
        assert_eq!(slug_empresa("Ravago Americas LLC"), "RavagoAmericasLLC");
    }

    #[test]
    fn safe_filename_keeps_separators() {
        assert_eq!(safe_filename("informe mayo 2024"), "informe-mayo-2024");
        assert_eq!(safe_filename("facturación.xlsx"), "facturacion.xlsx");
        assert_eq!(safe_filename("€€€"), "archivo");
    }

    #[test]
    fn extension_is_enforced() {
        assert_eq!(ensure_extension("reporte", "xlsx"), "reporte.xlsx");
        assert_eq!(ensure_extension("reporte.XLSX", ".xlsx"), "reporte.XLSX");
        assert_eq!(ensure_extension("reporte.docx", ".xlsx"), "reporte.docx.xlsx");
    }

    #[test]
    fn suggested_name_by_empresa() {
        let d = chrono::NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert_eq!(
            build_report_filename("Ravago Americas LLC", d),
            "240531-LV-RavagoAmericasLLC-Facturación honorarios.xlsx"
        );
        assert_eq!(
            build_report_filename("Gwealth", d),
            "240531-LV-Gwealth-Facturación honorarios.docx"
        );
    }

    #[test]
    fn user_edited_name_gets_correct_extension() {
        let out = final_filename("mi reporte", "sugerido.docx", "Gwealth");
        assert_eq!(out, "mi-reporte.docx");
        let out = final_filename("   ", "sugerido.xlsx", "Ravago Americas LLC");
        assert_eq!(out, "sugerido.xlsx");
    }
}
