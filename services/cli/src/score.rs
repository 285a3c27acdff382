use crate::infra::read_input;
use clap::Args;
use std::path::PathBuf;
use titleguard_risk::config::AppConfig;
use titleguard_risk::error::AppError;
use titleguard_risk::{ModelRegistry, PropertyFactorRecord, RiskEngine, RiskResult};
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Property factor record as JSON; `-` reads from stdin
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Skip the models and report the weighted aggregate only
    #[arg(long)]
    pub(crate) weighted_only: bool,
    /// Print the result on a single line
    #[arg(long)]
    pub(crate) compact: bool,
}

pub(crate) fn run_score(args: ScoreArgs, config: &AppConfig) -> Result<(), AppError> {
    let raw = read_input(&args.input)?;
    let record: PropertyFactorRecord = serde_json::from_str(&raw)?;

    let registry = if args.weighted_only {
        ModelRegistry::disabled("weighted-only scoring requested")
    } else {
        ModelRegistry::initialize(&config.models)
    };

    let result = RiskEngine::new().score(&record, &registry);
    info!(
        overall_score = result.overall_score,
        tier = result.risk_tier.label(),
        "scored property"
    );

    println!("{}", render_result(&result, args.compact)?);
    Ok(())
}

fn render_result(result: &RiskResult, compact: bool) -> Result<String, AppError> {
    let rendered = if compact {
        serde_json::to_string(result)?
    } else {
        serde_json::to_string_pretty(result)?
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_rendering_is_single_line() {
        let record = PropertyFactorRecord::new("X", false, 400.0, 0.02, 0.35);
        let result = RiskEngine::new().score(&record, &ModelRegistry::disabled("test"));

        let compact = render_result(&result, true).expect("renders");
        let pretty = render_result(&result, false).expect("renders");

        assert!(!compact.contains('\n'));
        assert!(pretty.lines().count() > 1);
        let value: serde_json::Value = serde_json::from_str(&compact).expect("valid json");
        assert_eq!(value["scoring_method"], "weighted_only");
    }
}
