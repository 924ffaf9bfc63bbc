mod engine;
mod error;
mod pipeline;
mod types;

pub use engine::{
    accumulate, drawdown, grow, spending_target, try_accumulate, try_drawdown, try_grow,
};
pub use error::InputError;
pub use pipeline::{cascade_from, run_pipeline};
pub use types::{
    AccumulationInput, Component, ComponentKind, DEFAULT_HORIZON_PERIODS, Decomposition,
    DrawdownInput, DrawdownResult, GrowthInput, LedgerRow, PipelineInputs, PipelineRun, Stage,
    StageResult, StageStatus,
};
