//! Presentation side of the pipeline.
//!
//! Sinks receive raw numbers and decide how to show them. [`TextReport`] is the
//! terminal renderer used by the CLI; the HTTP API serializes the same values
//! to JSON instead.

use crate::core::{DrawdownResult, PipelineRun, Stage, StageResult};

pub trait PresentationSink {
    fn stage(&mut self, stage: Stage, result: &StageResult);
    fn drawdown(&mut self, result: &DrawdownResult);
}

/// Feeds a completed run to `sink`, upstream stage first.
pub fn present<S: PresentationSink + ?Sized>(run: &PipelineRun, sink: &mut S) {
    sink.stage(Stage::Accumulation, &run.accumulation);
    sink.stage(Stage::Growth, &run.growth);
    sink.drawdown(&run.drawdown);
}

/// US-dollar formatting with thousands separators, e.g. `-$1,234.57`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // -0.001 rounds to zero and must not print a sign.
    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

#[derive(Debug, Default)]
pub struct TextReport {
    out: String,
}

impl TextReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }
}

impl PresentationSink for TextReport {
    fn stage(&mut self, stage: Stage, result: &StageResult) {
        self.line(stage.title());
        self.line(&format!(
            "  {:<22} {:>18}",
            "End Balance",
            format_currency(result.terminal_balance)
        ));
        for (component, (_, share)) in result
            .decomposition
            .components()
            .iter()
            .zip(result.decomposition.shares())
        {
            self.line(&format!(
                "  {:<22} {:>18} {:>7.1}%",
                component.kind.label(),
                format_currency(component.value),
                share
            ));
        }
        self.out.push('\n');
    }

    fn drawdown(&mut self, result: &DrawdownResult) {
        self.line(Stage::Drawdown.title());
        let lasts = match result.periods_until_depleted {
            None => "N/A".to_string(),
            Some(years) if result.exceeded_horizon => {
                format!("{years} (and likely beyond, capped at {years} years)")
            }
            Some(years) => years.to_string(),
        };
        self.line(&format!("  Money lasts (years): {lasts}"));
        if result.ledger.is_empty() {
            return;
        }

        self.line(&format!(
            "  {:>4} {:>18} {:>16} {:>26} {:>18}",
            "Year",
            "Starting Balance",
            "Return Earned",
            "Spending (Inflation Adj.)",
            "Ending Balance"
        ));
        for row in &result.ledger {
            self.line(&format!(
                "  {:>4} {:>18} {:>16} {:>26} {:>18}",
                row.period,
                format_currency(row.starting_balance),
                format_currency(row.return_earned),
                format_currency(row.withdrawal),
                format_currency(row.ending_balance)
            ));
        }
        if let Some(years) = result.periods_until_depleted.filter(|_| result.depleted()) {
            self.line(&format!("  Money ran out in year {years}."));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AccumulationInput, DrawdownInput, GrowthInput, PipelineInputs, run_pipeline,
    };

    #[derive(Default)]
    struct Recorder {
        stages: Vec<(Stage, f64)>,
        ledger_len: Option<usize>,
    }

    impl PresentationSink for Recorder {
        fn stage(&mut self, stage: Stage, result: &StageResult) {
            self.stages.push((stage, result.terminal_balance));
        }

        fn drawdown(&mut self, result: &DrawdownResult) {
            self.ledger_len = Some(result.ledger.len());
        }
    }

    fn sample_run(monthly_spending: f64) -> PipelineRun {
        run_pipeline(&PipelineInputs {
            accumulation: AccumulationInput::new(10_000.0, 20.0, 0.07, 6_000.0),
            growth: GrowthInput::new(0.0, 10.0, 0.07),
            drawdown: DrawdownInput::new(0.0, monthly_spending * 12.0, 0.05, 0.03),
        })
    }

    #[test]
    fn format_currency_groups_thousands_and_rounds_cents() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(5.0), "$5.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(8875.375337), "$8,875.38");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-42_000.1), "-$42,000.10");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(f64::NAN), "N/A");
    }

    #[test]
    fn present_feeds_stages_in_pipeline_order() {
        let run = sample_run(4_000.0);
        let mut recorder = Recorder::default();
        present(&run, &mut recorder);

        assert_eq!(recorder.stages.len(), 2);
        assert_eq!(
            recorder.stages[0],
            (Stage::Accumulation, run.accumulation.terminal_balance)
        );
        assert_eq!(
            recorder.stages[1],
            (Stage::Growth, run.growth.terminal_balance)
        );
        assert_eq!(recorder.ledger_len, Some(run.drawdown.ledger.len()));
    }

    #[test]
    fn text_report_prints_depletion_footer() {
        let run = sample_run(4_000.0);
        assert!(run.drawdown.depleted());

        let mut report = TextReport::new();
        present(&run, &mut report);
        let text = report.into_string();

        assert!(text.contains("Investment Breakdown"));
        assert!(text.contains("Total Contributions"));
        assert!(text.contains("$120,000.00"));
        assert!(text.contains("Growth Breakdown (No Contributions)"));
        assert!(text.contains("Spending (Inflation Adj.)"));
        let years = run.drawdown.periods_until_depleted.expect("valid drawdown");
        assert!(text.contains(&format!("Money ran out in year {years}.")));
    }

    #[test]
    fn text_report_notes_horizon_cap() {
        let run = sample_run(100.0);
        assert!(run.drawdown.exceeded_horizon);

        let mut report = TextReport::new();
        present(&run, &mut report);
        let text = report.into_string();
        assert!(text.contains("150 (and likely beyond, capped at 150 years)"));
        assert!(!text.contains("Money ran out"));
    }

    #[test]
    fn text_report_shows_not_available_for_invalid_drawdown() {
        let mut report = TextReport::new();
        report.drawdown(&DrawdownResult::not_available());
        let text = report.into_string();
        assert!(text.contains("Money lasts (years): N/A"));
        assert!(!text.contains("Starting Balance"));
    }

    #[test]
    fn text_report_stage_block_layout() {
        let run = sample_run(4_000.0);
        let mut report = TextReport::new();
        report.stage(Stage::Accumulation, &run.accumulation);
        let text = report.into_string();

        let lines: Vec<&str> = text.trim_end().lines().collect();
        assert_eq!(lines[0], "Investment Breakdown");
        assert!(lines[1].starts_with("  End Balance"));
        assert!(lines[1].ends_with(&format_currency(run.accumulation.terminal_balance)));
        assert_eq!(lines.len(), 2 + run.accumulation.decomposition.components().len());
        assert!(lines[2..].iter().all(|line| line.ends_with('%')));
        assert!(text.ends_with("%\n\n"));
    }
}
