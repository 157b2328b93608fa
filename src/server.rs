use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Local;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

use facturador::preview::escape_html;
use facturador::{
    build_report_filename, create_report, filter_options, filter_table, final_filename,
    generate_preview_html, load_workbooks, Config, ReportContext, Table, EMPRESA_RAVAGO, TODAS,
    TODOS,
};

const SESSION_COOKIE: &str = "sid";
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
/// Filas mostradas como máximo en la tabla de datos filtrados.
const MAX_FILAS_TABLA: usize = 100;

/// Estado por sesión: los archivos subidos ya combinados y el último
/// reporte generado, listo para descargar.
#[derive(Default)]
struct Session {
    table: Table,
    warnings: Vec<String>,
    download: Option<Download>,
}

struct Download {
    bytes: Vec<u8>,
    name: String,
    mime: &'static str,
}

struct AppState {
    sessions: Mutex<HashMap<String, Session>>,
    config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load(Path::new("facturador.json"))?;
    let port = config.effective_port();
    let state = Arc::new(AppState {
        sessions: Mutex::new(HashMap::new()),
        config,
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/generate", post(generate))
        .route("/download", get(download))
        .route("/options", get(options))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("generador de reportes de facturación en http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize, Default)]
struct Seleccion {
    #[serde(default)]
    empresa: String,
    #[serde(default)]
    anio: String,
    #[serde(default)]
    mes: String,
}

#[derive(Deserialize)]
struct GenerateForm {
    #[serde(default)]
    empresa: String,
    #[serde(default)]
    anio: String,
    #[serde(default)]
    mes: String,
    #[serde(default)]
    reporta: String,
    #[serde(default)]
    revisor: String,
    #[serde(default)]
    nombre_archivo: String,
}

async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(sel): Query<Seleccion>,
) -> Response {
    let (sid, nueva) = session_id(&headers);
    let html = {
        let sessions = state.sessions.lock().unwrap();
        render_page(&state.config, sessions.get(&sid), &sel, &[], "")
    };
    with_cookie(Html(html), &sid, nueva)
}

async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let (sid, nueva) = session_id(&headers);
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("files") {
            continue;
        }
        let name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "carga.xlsx".to_string());
        match field.bytes().await {
            Ok(bytes) if !bytes.is_empty() => files.push((name, bytes.to_vec())),
            Ok(_) => {}
            Err(e) => tracing::warn!("lectura de {} falló: {}", name, e),
        }
    }

    let html = {
        let mut sessions = state.sessions.lock().unwrap();
        let session = sessions.entry(sid.clone()).or_default();
        let aviso;
        if files.is_empty() {
            aviso = "No se recibió ningún archivo.".to_string();
        } else {
            let (table, warnings) = load_workbooks(&files);
            tracing::info!(
                "{} archivo(s) cargados, {} filas combinadas",
                files.len(),
                table.len()
            );
            aviso = format!(
                "{} archivo(s) procesados, {} filas disponibles.",
                files.len(),
                table.len()
            );
            session.table = table;
            session.warnings = warnings;
            session.download = None;
        }
        render_page(
            &state.config,
            Some(session),
            &Seleccion::default(),
            &[aviso],
            "",
        )
    };
    with_cookie(Html(html), &sid, nueva)
}

async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<GenerateForm>,
) -> Response {
    let (sid, nueva) = session_id(&headers);
    let sel = Seleccion {
        empresa: form.empresa.clone(),
        anio: form.anio.clone(),
        mes: form.mes.clone(),
    };

    let html = {
        let mut sessions = state.sessions.lock().unwrap();
        let session = sessions.entry(sid.clone()).or_default();
        let mut avisos = Vec::new();
        let mut descarga = "";

        if session.table.is_empty() {
            avisos.push("Primero cargue uno o más archivos de Excel.".to_string());
        } else if !seleccion_especifica(&sel) {
            avisos.push(
                "Seleccione una empresa, un año y un mes concretos para generar el reporte."
                    .to_string(),
            );
        } else {
            let filtered = filter_table(&session.table, &sel.empresa, &sel.anio, &sel.mes);
            if filtered.is_empty() {
                avisos.push(format!(
                    "No hay filas para {} en {} de {}; no se generó el reporte.",
                    sel.empresa, sel.mes, sel.anio
                ));
            } else {
                let hoy = Local::now().date_naive();
                let ctx = ReportContext::build(
                    &filtered,
                    &sel.empresa,
                    &sel.anio,
                    &sel.mes,
                    &form.reporta,
                    &form.revisor,
                    hoy,
                );
                match create_report(&ctx) {
                    Ok((bytes, mime)) => {
                        let sugerido = build_report_filename(&sel.empresa, hoy);
                        let name = final_filename(&form.nombre_archivo, &sugerido, &sel.empresa);
                        tracing::info!("reporte generado: {} ({} bytes)", name, bytes.len());
                        avisos.push(format!("Reporte listo: {}.", name));
                        session.download = Some(Download { bytes, name, mime });
                        descarga = "/download";
                    }
                    Err(e) => {
                        tracing::warn!("generación falló: {:#}", e);
                        avisos.push(format!("No se pudo generar el reporte: {}", e));
                    }
                }
            }
        }

        render_page(&state.config, Some(session), &sel, &avisos, descarga)
    };
    with_cookie(Html(html), &sid, nueva)
}

async fn download(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (sid, _) = session_id(&headers);
    let sessions = state.sessions.lock().unwrap();
    match sessions.get(&sid).and_then(|s| s.download.as_ref()) {
        Some(d) => (
            [
                (header::CONTENT_TYPE, d.mime.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", d.name),
                ),
            ],
            d.bytes.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("No hay ningún reporte generado en esta sesión."),
        )
            .into_response(),
    }
}

/// Opciones de filtro en JSON, con el mismo estrechamiento que la página.
async fn options(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(sel): Query<Seleccion>,
) -> Response {
    let (sid, _) = session_id(&headers);
    let sessions = state.sessions.lock().unwrap();
    let table = sessions.get(&sid).map(|s| &s.table);
    let opts = match table {
        Some(t) => filter_options(t, valor_especifico(&sel.empresa), valor_especifico(&sel.anio)),
        None => filter_options(&Table::default(), None, None),
    };
    Json(opts).into_response()
}

fn seleccion_especifica(sel: &Seleccion) -> bool {
    valor_especifico(&sel.empresa).is_some()
        && valor_especifico(&sel.anio).is_some()
        && valor_especifico(&sel.mes).is_some()
}

/// `None` cuando el valor es vacío o el centinela "Todas"/"Todos".
fn valor_especifico(valor: &str) -> Option<&str> {
    if valor.is_empty() || valor == TODAS || valor == TODOS {
        None
    } else {
        Some(valor)
    }
}

fn session_id(headers: &HeaderMap) -> (String, bool) {
    let existing = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|c| {
                let c = c.trim();
                c.strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                    .map(|v| v.to_string())
            })
        })
        .filter(|v| !v.is_empty());
    match existing {
        Some(sid) => (sid, false),
        None => {
            let sid: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();
            (sid, true)
        }
    }
}

fn with_cookie(html: Html<String>, sid: &str, nueva: bool) -> Response {
    if nueva {
        (
            [(
                header::SET_COOKIE,
                format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, sid),
            )],
            html,
        )
            .into_response()
    } else {
        html.into_response()
    }
}

const PAGE_CSS: &str = r#"
body{font-family:-apple-system,BlinkMacSystemFont,Segoe UI,Roboto,Helvetica,Arial,sans-serif;padding:24px;background:#f8fafc}
.card{max-width:960px;margin:0 auto 20px;border:1px solid #e5e7eb;border-radius:12px;padding:24px;background:white;box-shadow:0 10px 25px rgba(0,0,0,0.05)}
h2{color:#003366;margin-top:0}
label{display:block;margin:12px 0 6px;color:#374151}
input[type=file],input[type=text],select{width:100%;padding:10px;border:1px solid #d1d5db;border-radius:8px;box-sizing:border-box}
select:disabled{background:#f3f4f6;color:#9ca3af}
button{margin-top:16px;padding:10px 16px;background:#003366;color:white;border:none;border-radius:8px;cursor:pointer}
button:disabled{background:#9ca3af;cursor:not-allowed}
small{color:#6b7280}
.aviso{background:#fef3c7;border:1px solid #fcd34d;border-radius:8px;padding:10px 14px;margin:8px 0;color:#92400e}
.ok{background:#d1fae5;border-color:#6ee7b7;color:#065f46}
.filtros{display:flex;gap:12px}
.filtros>div{flex:1}
table.datos{border-collapse:collapse;width:100%;font-size:13px;margin-top:12px}
table.datos th{background:#002060;color:white;padding:6px 8px;text-align:left}
table.datos td{border:1px solid #e5e7eb;padding:5px 8px}
a.descarga{display:inline-block;margin-top:12px;padding:10px 16px;background:#065f46;color:white;border-radius:8px;text-decoration:none}
"#;

fn render_page(
    config: &Config,
    session: Option<&Session>,
    sel: &Seleccion,
    avisos: &[String],
    descarga: &str,
) -> String {
    let vacia = Table::default();
    let table = session.map(|s| &s.table).unwrap_or(&vacia);
    let warnings = session.map(|s| s.warnings.as_slice()).unwrap_or(&[]);

    let mut body = String::new();
    body.push_str("<div class='card'><h2>Generador de reportes de facturación</h2>");

    for w in warnings {
        body.push_str(&format!("<div class='aviso'>{}</div>", escape_html(w)));
    }
    for a in avisos {
        let clase = if a.starts_with("Reporte listo") { "aviso ok" } else { "aviso" };
        body.push_str(&format!("<div class='{}'>{}</div>", clase, escape_html(a)));
    }
    if !descarga.is_empty() {
        body.push_str("<a class='descarga' href='/download'>Descargar reporte</a>");
    }

    // Carga de archivos.
    body.push_str(
        "<form action='/upload' method='post' enctype='multipart/form-data'>\
         <label>Archivos de Excel (.xlsx o .xls)</label>\
         <input name='files' type='file' accept='.xlsx,.xls' multiple required />\
         <button type='submit'>Cargar</button>\
         <div><small>Los archivos reemplazan los datos cargados anteriormente; \
         las columnas se combinan por nombre.</small></div></form></div>",
    );

    if table.is_empty() {
        body.push_str(
            "<div class='card'><small>Cargue archivos para habilitar los filtros \
             y la generación del reporte.</small></div>",
        );
        return pagina(&body);
    }

    // Filtros con estrechamiento: cada cambio reenvía el formulario.
    let opts = filter_options(
        table,
        valor_especifico(&sel.empresa),
        valor_especifico(&sel.anio),
    );
    let empresa_elegida = valor_especifico(&sel.empresa).is_some();
    let anio_elegido = valor_especifico(&sel.anio).is_some();
    body.push_str(
        "<div class='card'><h2>Filtros</h2><form action='/' method='get'><div class='filtros'>",
    );
    body.push_str(&format!(
        "<div><label>Empresa</label>{}</div>",
        select_html("empresa", &opts.empresas, &sel.empresa, true)
    ));
    body.push_str(&format!(
        "<div><label>Año asignación</label>{}</div>",
        select_html("anio", &opts.anios, &sel.anio, empresa_elegida)
    ));
    body.push_str(&format!(
        "<div><label>Mes asignación</label>{}</div>",
        select_html("mes", &opts.meses, &sel.mes, anio_elegido)
    ));
    body.push_str("</div><noscript><button type='submit'>Aplicar</button></noscript></form>");

    let filtered = filter_table(table, &sel.empresa, &sel.anio, &sel.mes);
    body.push_str(&format!(
        "<p><small>{} de {} filas tras aplicar los filtros.</small></p>",
        filtered.len(),
        table.len()
    ));
    body.push_str(&tabla_html(&filtered));
    body.push_str("</div>");

    // Generación del reporte.
    let especifica = seleccion_especifica(sel);
    let hoy = Local::now().date_naive();
    let sugerido = if especifica {
        build_report_filename(&sel.empresa, hoy)
    } else {
        String::new()
    };
    body.push_str("<div class='card'><h2>Reporte</h2><form action='/generate' method='post'>");
    for (campo, valor) in [("empresa", &sel.empresa), ("anio", &sel.anio), ("mes", &sel.mes)] {
        body.push_str(&format!(
            "<input type='hidden' name='{}' value='{}' />",
            campo,
            escape_attr(valor)
        ));
    }
    body.push_str(&format!(
        "<label>Funcionario que reporta</label>\
         <input name='reporta' type='text' value='{}' />",
        escape_attr(&config.reporta)
    ));
    body.push_str(&format!(
        "<label>Funcionario revisor</label>\
         <input name='revisor' type='text' value='{}' />",
        escape_attr(&config.revisor)
    ));
    if sel.empresa == EMPRESA_RAVAGO {
        body.push_str(
            "<div><small>Para Ravago los funcionarios aparecen en la hoja de \
             facturación; si se dejan vacíos se imprime una línea para firmar.</small></div>",
        );
    }
    body.push_str(&format!(
        "<label>Nombre del archivo</label>\
         <input name='nombre_archivo' type='text' value='{}' placeholder='Se sugiere uno si se deja vacío' />",
        escape_attr(&sugerido)
    ));
    let deshabilitado = if especifica && !filtered.is_empty() { "" } else { " disabled" };
    body.push_str(&format!(
        "<button type='submit'{}>Generar reporte</button>",
        deshabilitado
    ));
    if !especifica {
        body.push_str(
            "<div><small>Elija empresa, año y mes concretos para poder generar.</small></div>",
        );
    }
    body.push_str("</form></div>");

    // Previsualización en línea cuando la selección es concreta.
    if especifica && !filtered.is_empty() {
        let ctx = ReportContext::build(
            &filtered,
            &sel.empresa,
            &sel.anio,
            &sel.mes,
            &config.reporta,
            &config.revisor,
            hoy,
        );
        body.push_str("<div class='card'><h2>Previsualización</h2>");
        body.push_str(&generate_preview_html(&ctx));
        body.push_str("</div>");
    }

    pagina(&body)
}

fn pagina(body: &str) -> String {
    format!(
        "<!doctype html><html lang='es'><head><meta charset='utf-8'/>\
         <title>Reportes de facturación</title>\
         <meta name='viewport' content='width=device-width, initial-scale=1'/>\
         <style>{}</style></head><body>{}</body></html>",
        PAGE_CSS, body
    )
}

fn select_html(name: &str, valores: &[String], elegido: &str, habilitado: bool) -> String {
    let mut out = format!(
        "<select name='{}' onchange='this.form.submit()'{}>",
        name,
        if habilitado { "" } else { " disabled" }
    );
    for v in valores {
        let marcado = if v == elegido { " selected" } else { "" };
        out.push_str(&format!(
            "<option value='{}'{}>{}</option>",
            escape_attr(v),
            marcado,
            escape_html(v)
        ));
    }
    out.push_str("</select>");
    out
}

fn tabla_html(table: &Table) -> String {
    if table.is_empty() {
        return "<p><small>Sin filas que mostrar.</small></p>".to_string();
    }
    let mut out = String::from("<table class='datos'><tr>");
    for h in &table.headers {
        out.push_str(&format!("<th>{}</th>", escape_html(h)));
    }
    out.push_str("</tr>");
    for row in table.rows.iter().take(MAX_FILAS_TABLA) {
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&format!("<td>{}</td>", escape_html(&cell.display())));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    if table.len() > MAX_FILAS_TABLA {
        out.push_str(&format!(
            "<p><small>Se muestran las primeras {} filas de {}.</small></p>",
            MAX_FILAS_TABLA,
            table.len()
        ));
    }
    out
}

/// Escapa también comillas para valores de atributos HTML.
fn escape_attr(s: &str) -> String {
    escape_html(s).replace('\'', "&#39;").replace('"', "&quot;")
}
