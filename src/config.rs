use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuración opcional del servicio. Si el archivo no existe se usan
/// los valores por defecto; la variable de entorno PORT tiene prioridad
/// sobre el puerto configurado.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    /// Funcionario que reporta, prellenado en el formulario.
    pub reporta: String,
    /// Funcionario revisor, prellenado en el formulario.
    pub revisor: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3002,
            reporta: String::new(),
            revisor: String::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("no se pudo leer {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("configuración inválida en {}", path.display()))?;
        Ok(config)
    }

    /// Puerto efectivo: PORT del entorno si está definido y es válido.
    pub fn effective_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/no/existe/facturador.json")).unwrap();
        assert_eq!(config.port, 3002);
        assert!(config.reporta.is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facturador.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"reporta": "Ana"}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.reporta, "Ana");
        assert_eq!(config.port, 3002);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facturador.json");
        std::fs::write(&path, "no es json").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
