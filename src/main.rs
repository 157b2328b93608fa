use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use facturador::{
    build_report_filename, create_report, filter_options, filter_table, final_filename,
    load_workbooks, ReportContext,
};

#[derive(Parser)]
#[command(name = "facturador")]
#[command(about = "Genera reportes mensuales de facturación a partir de archivos de Excel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Genera el reporte (.xlsx o .docx según la empresa) para una selección
    Generate {
        /// Archivos de entrada (.xlsx o .xls); las columnas se combinan por nombre
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<String>,
        /// Empresa exacta, p. ej. "Ravago Americas LLC"
        #[arg(short, long)]
        empresa: String,
        /// Año de asignación, p. ej. 2024
        #[arg(short, long)]
        anio: String,
        /// Mes de asignación en español, p. ej. Mayo
        #[arg(short, long)]
        mes: String,
        /// Funcionario que reporta
        #[arg(long, default_value = "")]
        reporta: String,
        /// Funcionario revisor
        #[arg(long, default_value = "")]
        revisor: String,
        /// Ruta de salida; por defecto el nombre sugerido en el directorio actual
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Muestra empresas, años y meses disponibles en los archivos, como JSON
    Inspect {
        /// Archivos de entrada (.xlsx o .xls)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<String>,
        /// Restringe los años a los de esta empresa
        #[arg(short, long)]
        empresa: Option<String>,
        /// Restringe los meses a los de este año
        #[arg(short, long)]
        anio: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            input,
            empresa,
            anio,
            mes,
            reporta,
            revisor,
            output,
        } => generate(&input, &empresa, &anio, &mes, &reporta, &revisor, output),
        Commands::Inspect { input, empresa, anio } => inspect(&input, empresa, anio),
    }
}

fn read_inputs(paths: &[String]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes =
            std::fs::read(path).with_context(|| format!("no se pudo leer {}", path))?;
        files.push((path.clone(), bytes));
    }
    Ok(files)
}

fn generate(
    inputs: &[String],
    empresa: &str,
    anio: &str,
    mes: &str,
    reporta: &str,
    revisor: &str,
    output: Option<String>,
) -> Result<()> {
    let files = read_inputs(inputs)?;
    let (table, warnings) = load_workbooks(&files);
    for w in &warnings {
        tracing::warn!("{}", w);
    }
    if table.is_empty() {
        bail!("ningún archivo de entrada contenía filas de datos");
    }

    let filtered = filter_table(&table, empresa, anio, mes);
    if filtered.is_empty() {
        bail!(
            "no hay filas para {} en {} de {}; revise la selección con `inspect`",
            empresa,
            mes,
            anio
        );
    }

    let hoy = chrono::Local::now().date_naive();
    let ctx = ReportContext::build(&filtered, empresa, anio, mes, reporta, revisor, hoy);
    let (bytes, _mime) = create_report(&ctx)?;

    let sugerido = build_report_filename(empresa, hoy);
    let destino = match output {
        Some(path) => final_filename(&path, &sugerido, empresa),
        None => sugerido,
    };
    std::fs::write(&destino, &bytes)
        .with_context(|| format!("no se pudo escribir {}", destino))?;
    println!(
        "Reporte generado: {} ({} filas, {} bytes)",
        destino,
        filtered.len(),
        bytes.len()
    );
    Ok(())
}

fn inspect(inputs: &[String], empresa: Option<String>, anio: Option<String>) -> Result<()> {
    let files = read_inputs(inputs)?;
    let (table, warnings) = load_workbooks(&files);
    for w in &warnings {
        tracing::warn!("{}", w);
    }
    let opts = filter_options(&table, empresa.as_deref(), anio.as_deref());
    println!("{}", serde_json::to_string_pretty(&opts)?);
    Ok(())
}
