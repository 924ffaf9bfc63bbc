use tracing::debug;

use super::error::{InputError, non_negative, period_count, positive};
use super::types::{
    AccumulationInput, ComponentKind, DEFAULT_HORIZON_PERIODS, Decomposition, DrawdownInput,
    DrawdownResult, GrowthInput, LedgerRow, StageResult, StageStatus,
};

impl AccumulationInput {
    pub fn new(
        principal: f64,
        periods: f64,
        periodic_rate: f64,
        periodic_contribution: f64,
    ) -> Self {
        Self {
            principal,
            periods,
            periodic_rate,
            periodic_contribution,
        }
    }
}

impl GrowthInput {
    pub fn new(starting_balance: f64, periods: f64, periodic_rate: f64) -> Self {
        Self {
            starting_balance,
            periods,
            periodic_rate,
        }
    }
}

impl DrawdownInput {
    pub fn new(
        starting_balance: f64,
        periodic_spending: f64,
        return_rate: f64,
        inflation_rate: f64,
    ) -> Self {
        Self {
            starting_balance,
            periodic_spending,
            return_rate,
            inflation_rate,
            max_periods: DEFAULT_HORIZON_PERIODS,
        }
    }

    pub fn with_max_periods(self, max_periods: u32) -> Self {
        Self {
            max_periods,
            ..self
        }
    }
}

impl StageResult {
    pub fn cleared_accumulation() -> Self {
        Self {
            status: StageStatus::Cleared,
            terminal_balance: 0.0,
            decomposition: Decomposition::new(&[
                (ComponentKind::Starting, 0.0),
                (ComponentKind::Contributions, 0.0),
                (ComponentKind::Interest, 0.0),
            ]),
        }
    }

    pub fn cleared_growth() -> Self {
        Self {
            status: StageStatus::Cleared,
            terminal_balance: 0.0,
            decomposition: Decomposition::new(&[
                (ComponentKind::Starting, 0.0),
                (ComponentKind::Interest, 0.0),
            ]),
        }
    }
}

/// Principal plus end-of-period contributions compounded over `periods`.
/// Invalid input yields the cleared result.
pub fn accumulate(input: &AccumulationInput) -> StageResult {
    try_accumulate(input).unwrap_or_else(|err| {
        debug!(error = %err, ?input, "accumulation input invalid; clearing stage");
        StageResult::cleared_accumulation()
    })
}

pub fn try_accumulate(input: &AccumulationInput) -> Result<StageResult, InputError> {
    let principal = non_negative("principal", input.principal)?;
    let periods = period_count("periods", input.periods)?;
    let rate = non_negative("periodic rate", input.periodic_rate)?;
    let contribution = non_negative("periodic contribution", input.periodic_contribution)?;

    let contributions = contribution * periods as f64;
    let (terminal, interest) = if periods == 0 || rate == 0.0 {
        (principal + contributions, 0.0)
    } else {
        let terminal = scaled(principal, growth_factor(rate, periods))
            + scaled(contribution, annuity_factor(rate, periods));
        (terminal, terminal - principal - contributions)
    };

    if !terminal.is_finite() {
        return Err(InputError::NonFiniteResult);
    }

    Ok(StageResult {
        status: StageStatus::Computed,
        terminal_balance: terminal,
        decomposition: Decomposition::new(&[
            (ComponentKind::Starting, principal),
            (ComponentKind::Contributions, contributions),
            (ComponentKind::Interest, interest),
        ]),
    })
}

/// A single balance compounded over `periods` with no contributions.
pub fn grow(input: &GrowthInput) -> StageResult {
    try_grow(input).unwrap_or_else(|err| {
        debug!(error = %err, ?input, "growth input invalid; clearing stage");
        StageResult::cleared_growth()
    })
}

pub fn try_grow(input: &GrowthInput) -> Result<StageResult, InputError> {
    let starting = non_negative("starting balance", input.starting_balance)?;
    let periods = period_count("periods", input.periods)?;
    let rate = non_negative("periodic rate", input.periodic_rate)?;

    let terminal = if periods == 0 || rate == 0.0 {
        starting
    } else {
        scaled(starting, growth_factor(rate, periods))
    };
    if !terminal.is_finite() {
        return Err(InputError::NonFiniteResult);
    }

    Ok(StageResult {
        status: StageStatus::Computed,
        terminal_balance: terminal,
        decomposition: Decomposition::new(&[
            (ComponentKind::Starting, starting),
            (ComponentKind::Interest, terminal - starting),
        ]),
    })
}

/// Year-by-year depletion of a balance. Invalid input yields an empty,
/// not-available result.
pub fn drawdown(input: &DrawdownInput) -> DrawdownResult {
    try_drawdown(input).unwrap_or_else(|err| {
        debug!(error = %err, ?input, "drawdown input invalid; clearing stage");
        DrawdownResult::not_available()
    })
}

pub fn try_drawdown(input: &DrawdownInput) -> Result<DrawdownResult, InputError> {
    let mut balance = non_negative("starting balance", input.starting_balance)?;
    let spending = positive("periodic spending", input.periodic_spending)?;
    let return_rate = non_negative("return rate", input.return_rate)?;
    let inflation_rate = non_negative("inflation rate", input.inflation_rate)?;
    if input.max_periods == 0 {
        return Err(InputError::NotPositive {
            field: "max periods",
            value: 0.0,
        });
    }

    let mut ledger = Vec::with_capacity(input.max_periods.min(DEFAULT_HORIZON_PERIODS) as usize);
    let mut period = 0_u32;
    while balance > 0.0 && period < input.max_periods {
        period += 1;

        let return_earned = balance * return_rate;
        balance += return_earned;
        if !balance.is_finite() {
            return Err(InputError::NonFiniteResult);
        }

        let spending_target = spending_target(spending, inflation_rate, period);
        let withdrawal = balance.min(spending_target);
        let starting_balance = balance;
        // Never negative, so the next period never earns a return on a deficit.
        balance = (balance - withdrawal).max(0.0);

        ledger.push(LedgerRow {
            period,
            starting_balance,
            return_earned,
            spending_target,
            withdrawal,
            ending_balance: balance,
        });
    }

    let exceeded_horizon = balance > 0.0 && period >= input.max_periods;
    debug!(
        periods = period,
        exceeded_horizon,
        final_balance = balance,
        "drawdown simulated"
    );

    Ok(DrawdownResult {
        periods_until_depleted: Some(period),
        exceeded_horizon,
        ledger,
    })
}

/// The first period spends the base amount; escalation starts in period two.
pub fn spending_target(base: f64, inflation_rate: f64, period: u32) -> f64 {
    if period <= 1 {
        return base;
    }
    base * (1.0 + inflation_rate).powf(f64::from(period - 1))
}

fn growth_factor(rate: f64, periods: u32) -> f64 {
    (1.0 + rate).powf(f64::from(periods))
}

/// Future value of one unit paid at the end of each of `periods` periods.
fn annuity_factor(rate: f64, periods: u32) -> f64 {
    (f64::from(periods) * rate.ln_1p()).exp_m1() / rate
}

// 0 * inf is NaN; a zero amount stays zero however large the factor.
fn scaled(amount: f64, factor: f64) -> f64 {
    if amount == 0.0 { 0.0 } else { amount * factor }
}
