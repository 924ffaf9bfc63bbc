use tracing::{debug, info};

use super::engine::{accumulate, drawdown, grow};
use super::types::{PipelineInputs, PipelineRun, Stage, StageResult};

/// Runs every stage, forwarding each terminal balance downstream.
pub fn run_pipeline(inputs: &PipelineInputs) -> PipelineRun {
    let mut inputs = *inputs;

    let accumulation = accumulate(&inputs.accumulation);
    inputs.growth.starting_balance = forwarded_balance(&accumulation);
    let growth = grow(&inputs.growth);
    inputs.drawdown.starting_balance = forwarded_balance(&growth);
    let drawdown = drawdown(&inputs.drawdown);

    info!(
        accumulation_balance = accumulation.terminal_balance,
        growth_balance = growth.terminal_balance,
        periods_until_depleted = ?drawdown.periods_until_depleted,
        exceeded_horizon = drawdown.exceeded_horizon,
        "pipeline recomputed"
    );

    PipelineRun {
        inputs,
        accumulation,
        growth,
        drawdown,
    }
}

/// Re-runs `changed` and every stage after it, keeping `previous` results for
/// the stages before it. The changed stage uses the starting balance in
/// `inputs` as given, so a caller may override a forwarded balance.
pub fn cascade_from(
    changed: Stage,
    inputs: &PipelineInputs,
    previous: &PipelineRun,
) -> PipelineRun {
    debug!(?changed, "cascading recompute");
    match changed {
        Stage::Accumulation => run_pipeline(inputs),
        Stage::Growth => {
            let mut inputs = PipelineInputs {
                accumulation: previous.inputs.accumulation,
                ..*inputs
            };
            let growth = grow(&inputs.growth);
            inputs.drawdown.starting_balance = forwarded_balance(&growth);
            let drawdown = drawdown(&inputs.drawdown);
            PipelineRun {
                inputs,
                accumulation: previous.accumulation.clone(),
                growth,
                drawdown,
            }
        }
        Stage::Drawdown => {
            let inputs = PipelineInputs {
                accumulation: previous.inputs.accumulation,
                growth: previous.inputs.growth,
                drawdown: inputs.drawdown,
            };
            PipelineRun {
                inputs,
                accumulation: previous.accumulation.clone(),
                growth: previous.growth.clone(),
                drawdown: drawdown(&inputs.drawdown),
            }
        }
    }
}

// A cleared stage forwards its zero terminal balance.
fn forwarded_balance(result: &StageResult) -> f64 {
    result.terminal_balance
}
