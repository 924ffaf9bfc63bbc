use serde::Serialize;

/// Number of periods the drawdown simulation runs before it gives up.
pub const DEFAULT_HORIZON_PERIODS: u32 = 150;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Accumulation,
    Growth,
    Drawdown,
}

impl Stage {
    pub fn title(self) -> &'static str {
        match self {
            Stage::Accumulation => "Investment Breakdown",
            Stage::Growth => "Growth Breakdown (No Contributions)",
            Stage::Drawdown => "Retirement Withdrawal",
        }
    }
}

/// Raw accumulation parameters. NaN marks a missing or non-numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationInput {
    pub principal: f64,
    pub periods: f64,
    pub periodic_rate: f64,
    pub periodic_contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthInput {
    pub starting_balance: f64,
    pub periods: f64,
    pub periodic_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawdownInput {
    pub starting_balance: f64,
    pub periodic_spending: f64,
    pub return_rate: f64,
    pub inflation_rate: f64,
    pub max_periods: u32,
}

/// Inputs for all three stages. The starting balances of the growth and
/// drawdown stages are overwritten by the upstream stage whenever it runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInputs {
    pub accumulation: AccumulationInput,
    pub growth: GrowthInput,
    pub drawdown: DrawdownInput,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Starting,
    Contributions,
    Interest,
}

impl ComponentKind {
    pub fn label(self) -> &'static str {
        match self {
            ComponentKind::Starting => "Starting Amount",
            ComponentKind::Contributions => "Total Contributions",
            ComponentKind::Interest => "Total Interest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub kind: ComponentKind,
    pub value: f64,
}

/// Ordered breakdown of a terminal balance into its constituent parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Decomposition(Vec<Component>);

impl Decomposition {
    pub(crate) fn new(parts: &[(ComponentKind, f64)]) -> Self {
        Self(
            parts
                .iter()
                .map(|&(kind, value)| Component { kind, value })
                .collect(),
        )
    }

    pub fn components(&self) -> &[Component] {
        &self.0
    }

    pub fn get(&self, kind: ComponentKind) -> Option<f64> {
        self.0.iter().find(|c| c.kind == kind).map(|c| c.value)
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|c| c.value).sum()
    }

    /// Percentage share of each component; all zero when the total is zero.
    pub fn shares(&self) -> Vec<(ComponentKind, f64)> {
        let total = self.total();
        self.0
            .iter()
            .map(|c| {
                let share = if total > 0.0 {
                    c.value / total * 100.0
                } else {
                    0.0
                };
                (c.kind, share)
            })
            .collect()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Computed,
    /// Inputs were invalid; every value is zero.
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub status: StageStatus,
    pub terminal_balance: f64,
    pub decomposition: Decomposition,
}

impl StageResult {
    pub fn is_cleared(&self) -> bool {
        self.status == StageStatus::Cleared
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub period: u32,
    /// Balance after this period's return, before the withdrawal.
    pub starting_balance: f64,
    pub return_earned: f64,
    pub spending_target: f64,
    pub withdrawal: f64,
    pub ending_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawdownResult {
    /// `None` when the inputs were invalid. When the horizon was exceeded this
    /// is the number of simulated periods.
    pub periods_until_depleted: Option<u32>,
    pub exceeded_horizon: bool,
    pub ledger: Vec<LedgerRow>,
}

impl DrawdownResult {
    pub fn not_available() -> Self {
        Self {
            periods_until_depleted: None,
            exceeded_horizon: false,
            ledger: Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.periods_until_depleted.is_some()
    }

    pub fn depleted(&self) -> bool {
        self.is_available() && !self.exceeded_horizon
    }

    pub fn final_balance(&self) -> f64 {
        self.ledger.last().map(|row| row.ending_balance).unwrap_or(0.0)
    }

    pub fn total_withdrawn(&self) -> f64 {
        self.ledger.iter().map(|row| row.withdrawal).sum()
    }

    pub fn total_return(&self) -> f64 {
        self.ledger.iter().map(|row| row.return_earned).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    /// Inputs as actually used, with forwarded balances filled in.
    pub inputs: PipelineInputs,
    pub accumulation: StageResult,
    pub growth: StageResult,
    pub drawdown: DrawdownResult,
}
