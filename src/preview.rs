use crate::context::{format_amount, format_currency, ReportContext};

// La previsualización es una aproximación visual; el artefacto exportado es
// la versión autoritativa. Ambos consumen el mismo ReportContext, así que
// los agregados y las frases coinciden siempre.

const CSS: &str = r#"
    <style>
        .preview-container { font-family: 'Calibri', sans-serif; font-size: 11pt; padding: 20px; background-color: #f7f7f7; border-radius: 8px; }
        .header-info { margin-bottom: 20px; }
        .logo { float: right; width: 135px; height: 60px; background-color: #e0e0e0; text-align: center; line-height: 60px; font-weight: bold; }

        /* Estilo por defecto (Ravago, parecido a Excel) */
        table { border-collapse: collapse; width: 100%; margin-bottom: 20px; }
        th, td { border: 1px solid black; padding: 8px; text-align: left; }
        th { background-color: #002060; color: white; text-align: center; }
        .total-row td { background-color: #808080; color: white; font-weight: bold; }

        /* Estilos que imitan Word, solo dentro de contenedores .word */
        .word th { background-color: #003366; color: #FFFFFF; text-align: center; }
        .word .body-row td { background-color: #F0F0F0; color: #000000; }
        .word .total-row td { background-color: #E20074; color: #FFFFFF; font-weight: bold; }

        .right-align { text-align: right; }
        .left-align { text-align: left; }
        .center-align { text-align: center; }
        .footer-note { font-size: 9pt; font-style: italic; margin-top: 15px; }
    </style>
"#;

/// Escapado mínimo para interpolar texto de usuario en el HTML.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Fragmento HTML con la misma selección de plantilla que la exportación.
pub fn generate_preview_html(ctx: &ReportContext) -> String {
    let body = if ctx.is_ravago() {
        ravago_body(ctx)
    } else {
        word_body(ctx)
    };
    format!("<div class='preview-container'>{}{}</div>", CSS, body)
}

fn ravago_body(ctx: &ReportContext) -> String {
    let mut html = format!(
        r#"
        <h4>Hoja: Facturación</h4>
        <table>
            <tr><th>Año</th><th>Mes</th><th>Documentos Revisados (Ver Anexo 1)</th></tr>
            <tr><td class='center-align'>{anio}</td><td class='center-align'>{mes}</td><td class='center-align'>{num_docs}</td></tr>
            <tr class='total-row'><td colspan='2' class='center-align'>Total Por Facturar</td><td class='center-align'>{num_docs}</td></tr>
        </table>
        <table>
            <tr><th>Concepto</th><th>Total (antes de I.V.A)</th></tr>
            <tr><td>{concepto}</td><td class='right-align'>{total}</td></tr>
            <tr class='total-row'><td class='right-align'>SUBTOTAL</td><td class='right-align'>{total}</td></tr>
        </table>
        <div class='footer-note'>TRM Aplicable: Según la propuesta, es aquella de emisión de la factura.</div>
        <div class='footer-note'>biu usually issues monthly invoices...</div>
        <hr>
        <h4>Hoja: Anexo 1</h4>
        <table>
            <tr><th>FECHA</th><th>NOMBRE CONTRAPARTE</th><th>TIPO DE DOCUMENTO</th><th>TOTAL</th></tr>
"#,
        anio = escape_html(&ctx.anio),
        mes = escape_html(&ctx.mes),
        num_docs = ctx.num_docs,
        concepto = escape_html(&ctx.concepto_ravago()),
        total = format_currency(ctx.total_valor),
    );

    for (i, det) in ctx.detalles.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td class='center-align'>{}</td><td>{}</td><td>{}</td><td class='right-align'>{}</td></tr>",
            i + 1,
            escape_html(&det.nombre),
            escape_html(&det.tipo_documento),
            format_currency(det.valor.unwrap_or(0.0)),
        ));
    }
    html.push_str(&format!(
        "<tr class='total-row'><td colspan='3' class='right-align'>SUBTOTAL</td><td class='right-align'>{}</td></tr></table>",
        format_currency(ctx.total_valor)
    ));
    html
}

fn word_body(ctx: &ReportContext) -> String {
    format!(
        r#"
        <div class="header-info">
            <div class="logo">BIU<br>Logo</div>
        </div>

        <h4>FACTURACIÓN {mes_mayus} {anio}</h4>
        <h4>{empresa_mayus}</h4>

        <div class="info-section">
            <div class="info-line">Fecha de corte del reporte: {fecha}</div>
            <div class="info-line">Funcionario que reporta: &nbsp;&nbsp; {reporta}</div>
            <div class="info-line">Funcionario revisor: &nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp; {revisor}</div>
        </div>

        <div class="word">
            {tabla_principal}
            {tabla_resumen}
        </div>

        <div class="footer-note">Nota: Este es un documento de previsualización.</div>
        <hr>
        <div class="footer">
            Número: 601 - 7455289 | Dirección: Carrera 7 No. 74B-56, Oficina 301 | Correo: info@biu.com.co
        </div>
"#,
        mes_mayus = escape_html(&ctx.mes.to_uppercase()),
        anio = escape_html(&ctx.anio),
        empresa_mayus = escape_html(&ctx.empresa.to_uppercase()),
        fecha = ctx.fecha_corte_es(),
        reporta = escape_html(&ctx.reporta),
        revisor = escape_html(&ctx.revisor),
        tabla_principal = main_table_html(ctx),
        tabla_resumen = summary_tables_html(ctx),
    )
}

fn main_table_html(ctx: &ReportContext) -> String {
    let etiqueta = if ctx.is_gwealth() { "Total (precio único)" } else { "Total" };

    let mut html = String::from(
        r#"
    <table>
        <thead>
            <tr>
                <th>MES ASIGNACION</th>
                <th>AÑO ASIGNACION</th>
                <th>NOMBRE</th>
                <th>MONEDA</th>
                <th>VALOR</th>
            </tr>
        </thead>
        <tbody>
"#,
    );

    for det in &ctx.detalles {
        html.push_str(&format!(
            r#"<tr class="body-row"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            escape_html(&det.mes),
            escape_html(&det.anio),
            escape_html(&det.nombre),
            escape_html(&det.moneda),
            format_amount(det.valor.unwrap_or(0.0)),
        ));
    }

    html.push_str(&format!(
        r#"
            <tr class="total-row">
                <td colspan="4" class="center-align">{}</td>
                <td>{}</td>
            </tr>
        </tbody>
    </table>
"#,
        etiqueta,
        format_amount(ctx.total_tabla_principal()),
    ));
    html
}

fn summary_tables_html(ctx: &ReportContext) -> String {
    if ctx.empresa == crate::context::EMPRESA_ALTIMETRIK {
        return format!(
            r#"
        <table class="summary-table">
            <thead>
                <tr><th>Mes</th><th>Concepto</th><th>Total</th></tr>
            </thead>
            <tbody>
                <tr class="body-row"><td>{mes}</td><td>{concepto}</td><td>{total}</td></tr>
            </tbody>
        </table>
"#,
            mes = escape_html(&ctx.mes),
            concepto = escape_html(&ctx.concepto_consultas()),
            total = format_currency(ctx.total_valor),
        );
    }

    if ctx.is_gwealth() {
        return format!(
            r#"
        <table class="summary-table">
            <thead>
                <tr><th>Mes</th><th>Concepto</th><th>Total</th></tr>
            </thead>
            <tbody>
                <tr class="body-row"><td>{mes}</td><td>{concepto}</td><td>{precio}</td></tr>
                <tr class="total-row"><td colspan="2" class="center-align">TOTAL</td><td>{precio}</td></tr>
                <tr class="total-row"><td colspan="2" class="center-align">TOTAL CON IVA</td><td>{con_iva}</td></tr>
            </tbody>
        </table>
"#,
            mes = escape_html(&ctx.mes),
            concepto = escape_html(&ctx.concepto_consultas()),
            precio = format_currency(ctx.precio_unico),
            con_iva = format_currency(ctx.total_con_iva()),
        );
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ReportContext, EMPRESA_GWEALTH, EMPRESA_RAVAGO};
    use crate::table::{Cell, Table};
    use chrono::NaiveDate;

    fn context_for(empresa: &str, valores: &[f64]) -> ReportContext {
        let mut t = Table::new(vec![
            "EMPRESA".into(),
            "MES ASIGNACION".into(),
            "AÑO ASIGNACION".into(),
            "NOMBRE".into(),
            "MONEDA".into(),
            "VALOR".into(),
            "TIPO DE DOCUMENTO".into(),
            "NO. CASO".into(),
        ]);
        for (i, v) in valores.iter().enumerate() {
            t.rows.push(vec![
                Cell::Text(empresa.into()),
                Cell::Text("Mayo".into()),
                Cell::Number(2024.0),
                Cell::Text(format!("Nombre {}", i + 1)),
                Cell::Text("USD".into()),
                Cell::Number(*v),
                Cell::Text("Contrato".into()),
                Cell::Text(format!("C-{}", i + 1)),
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
    fn ravago_preview_shows_subtotal_and_detail() {
        let html = generate_preview_html(&context_for(EMPRESA_RAVAGO, &[100.0, 200.0, 100.0]));
        assert!(html.contains("Hoja: Facturación"));
        assert!(html.contains("USD 400.00"));
        assert!(html.contains("Revisión de 3 documentos durante el mes de Mayo de 2024"));
        // tres filas de detalle
        assert_eq!(html.matches("Nombre ").count(), 3);
    }

    #[test]
    fn gwealth_preview_uses_mode_and_iva() {
        let html = generate_preview_html(&context_for(EMPRESA_GWEALTH, &[50.0, 50.0, 75.0]));
        assert!(html.contains("Total (precio único)"));
        assert!(html.contains("TOTAL CON IVA"));
        assert!(html.contains("USD 59.50"));
        assert!(html.contains("Consultas en listas recibidas en Mayo de 2024"));
    }

    #[test]
    fn markup_escapes_user_text() {
        let mut ctx = context_for(EMPRESA_GWEALTH, &[10.0]);
        ctx.reporta = "<script>".into();
        let html = generate_preview_html(&ctx);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
