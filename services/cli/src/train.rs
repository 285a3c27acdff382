use clap::Args;
use titleguard_risk::config::AppConfig;
use titleguard_risk::error::AppError;
use titleguard_risk::model::ArtifactSource;
use titleguard_risk::{ModelArtifacts, ModelRegistry};

#[derive(Args, Debug, Default)]
pub(crate) struct TrainArgs {
    /// Retrain from the training data even when a compatible bundle exists
    #[arg(long)]
    pub(crate) force: bool,
}

pub(crate) fn run_train(args: TrainArgs, config: &AppConfig) -> Result<(), AppError> {
    let registry = if args.force {
        ModelRegistry::retrain(&config.models)?
    } else {
        ModelRegistry::initialize(&config.models)
    };

    println!("Model bundle: {}", config.models.bundle_path().display());
    match (registry.artifacts(), registry.source()) {
        (Some(artifacts), Some(source)) => {
            for line in bundle_lines(artifacts, source) {
                println!("{line}");
            }
        }
        _ => {
            let reason = registry.disabled_reason().unwrap_or("unknown");
            println!("- ML scoring disabled: {reason}");
        }
    }
    Ok(())
}

fn bundle_lines(artifacts: &ModelArtifacts, source: ArtifactSource) -> Vec<String> {
    let dataset = artifacts.dataset();
    let mut lines = vec![
        format!("- Source: {}", source.label()),
        format!("- Format version: {}", artifacts.format_version()),
        format!(
            "- Trained at: {}",
            artifacts.trained_at().format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!(
            "- Training rows: {} ({} delayed/defective)",
            dataset.rows, dataset.positives
        ),
        format!("- Dataset fingerprint: {:016x}", dataset.fingerprint),
        format!("- Trees: {}", artifacts.classifier().trees().len()),
        format!(
            "- Delay model iterations: {}",
            artifacts.delay_model().iterations()
        ),
    ];

    let mut importances: Vec<(String, f64)> = artifacts.feature_importances().into_iter().collect();
    importances.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    lines.push("\nTop features".to_string());
    lines.extend(
        importances
            .iter()
            .take(5)
            .map(|(name, share)| format!("- {name}: {:.1}%", share * 100.0)),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use titleguard_risk::model::{BoostingParams, TrainingSet};

    fn small_set() -> TrainingSet {
        let mut csv = String::from(
            "flood_exposure,flood_boundary_distance,easement_encroachment_pct,lot_coverage_ratio,\
             property_age,num_transfers_5yr,avg_holding_period_years,ownership_anomaly_score,\
             cv_vs_recorded_area_delta,label\n",
        );
        for i in 0..60 {
            let risky = i % 3 == 0;
            let (flood, distance, label) = if risky { (1, 0.0, 1) } else { (0, 800.0, 0) };
            csv.push_str(&format!(
                "{flood},{distance},0.1,0.5,{age},1,6.0,0.2,0.05,{label}\n",
                age = 10 + i
            ));
        }
        TrainingSet::from_reader(csv.as_bytes()).expect("valid csv")
    }

    #[test]
    fn summary_lists_provenance_and_top_features() {
        let params = BoostingParams {
            n_estimators: 10,
            ..BoostingParams::default()
        };
        let artifacts = ModelArtifacts::train(&small_set(), params, 1.0).expect("trains");

        let lines = bundle_lines(&artifacts, ArtifactSource::Trained);

        assert_eq!(lines[0], "- Source: trained");
        assert!(lines.iter().any(|line| line == "- Training rows: 60 (20 delayed/defective)"));
        assert!(lines.iter().any(|line| line == "- Trees: 10"));
        let top = lines
            .iter()
            .position(|line| line == "\nTop features")
            .expect("section present");
        assert_eq!(lines.len() - top - 1, 5);
    }
}
