use anyhow::{Context, Result};
use tracing::info;

use tsp_pipeline::config::Settings;
use tsp_pipeline::{ModelConfig, TspMultiRunPipeline, TspPipeline, TspPipelineOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tsp_pipeline=info".parse().unwrap()),
        )
        .init();

    let settings = Settings::from_env();
    settings.print_banner();

    let model = ModelConfig::from_yaml_file(&settings.model_config_path)?;
    info!(model = %model.name, provider = %model.provider, "Loaded model configuration");

    let root = settings.run_root();
    let options = TspPipelineOptions {
        resume_from: settings.resume_from.clone(),
        n_repeats: settings.n_repeats,
    };

    let pipeline = if settings.multi_run {
        TspMultiRunPipeline::configure(model, root.clone(), &options)
    } else {
        TspPipeline::configure(model, root.clone(), &options)
    };

    let description = pipeline.into_description();
    description
        .validate()
        .context("Pipeline description failed validation")?;

    let output_path = settings
        .output_path
        .clone()
        .unwrap_or_else(|| root.join("pipeline.json"));
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&output_path, description.to_json_pretty()?)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!(
        stages = description.stage_count(),
        path = %output_path.display(),
        "Wrote pipeline description"
    );
    Ok(())
}
