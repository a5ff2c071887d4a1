use std::path::PathBuf;

use chrono::Utc;

const DEFAULT_LOG_ROOT: &str = "logs";
const DEFAULT_MODEL_CONFIG: &str = "model.yaml";
const DEFAULT_N_REPEATS: u32 = 1;

/// Binary settings, sourced from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_root: PathBuf,
    pub model_config_path: PathBuf,
    pub resume_from: Option<PathBuf>,
    pub multi_run: bool,
    pub n_repeats: u32,
    pub output_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            log_root: PathBuf::from(
                std::env::var("LOG_ROOT").unwrap_or_else(|_| DEFAULT_LOG_ROOT.into()),
            ),
            model_config_path: PathBuf::from(
                std::env::var("MODEL_CONFIG").unwrap_or_else(|_| DEFAULT_MODEL_CONFIG.into()),
            ),
            resume_from: std::env::var("RESUME_FROM").ok().map(PathBuf::from),
            multi_run: env_parse("MULTI_RUN", false),
            n_repeats: env_parse("N_REPEATS", DEFAULT_N_REPEATS),
            output_path: std::env::var("OUTPUT").ok().map(PathBuf::from),
        }
    }

    /// Timestamped run directory every stage output nests under.
    pub fn run_root(&self) -> PathBuf {
        self.log_root
            .join(format!("tsp_{}", Utc::now().format("%Y%m%d_%H%M%S")))
    }

    pub fn print_banner(&self) {
        let mode = if self.multi_run {
            format!("multi-run (N={})", self.n_repeats)
        } else {
            "single-run".to_string()
        };
        tracing::info!("╔══════════════════════════════════════════════════╗");
        tracing::info!("║           tsp-pipeline v{}                    ║", env!("CARGO_PKG_VERSION"));
        tracing::info!("╠══════════════════════════════════════════════════╣");
        tracing::info!("║  Log root:       {:<31}║", self.log_root.display());
        tracing::info!("║  Model config:   {:<31}║", self.model_config_path.display());
        tracing::info!("║  Mode:           {:<31}║", mode);
        tracing::info!("║  Resume:         {:<31}║", if self.resume_from.is_some() { "enabled" } else { "disabled" });
        tracing::info!("╚══════════════════════════════════════════════════╝");
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
