//! Text rendering of a projection for the command line.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::{ProjectionSummary, YearRecord};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    #[serde(alias = "USD", alias = "dollar")]
    Usd,
    #[serde(alias = "EUR", alias = "euro")]
    Eur,
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }
}

const HEADERS: [&str; 5] = [
    "Age",
    "Start Balance",
    "Annual Contributions / Deductions",
    "Investment Growth",
    "End Balance",
];

/// Two fractional digits with comma thousands grouping, e.g. `-1,234.50`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // Negatives that round to zero keep their sign, as in `toLocaleString`.
    let sign = if value.is_sign_negative() { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

pub fn format_money(value: f64, currency: Currency) -> String {
    format!("{}{}", currency.symbol(), format_amount(value))
}

pub fn format_delta(value: f64, currency: Currency) -> String {
    let sign = if value >= 0.0 { '+' } else { '-' };
    format!("{sign}{}{}", currency.symbol(), format_amount(value.abs()))
}

pub fn render_text(
    summary: &ProjectionSummary,
    records: &[YearRecord],
    currency: Currency,
    with_table: bool,
) -> String {
    let mut out = String::new();

    if let Some(age) = summary.depletion_age {
        out.push_str(&format!("You will run out of money at age {age}.\n"));
    }
    if let Some(savings) = summary.savings_at_retirement {
        out.push_str(&format!(
            "Estimated savings at retirement (age {}): {}\n",
            summary.retirement_age,
            format_money(savings, currency)
        ));
    }
    out.push_str(&format!(
        "Estimated balance at end of simulation: {}\n",
        format_money(summary.final_balance, currency)
    ));

    if with_table && !records.is_empty() {
        out.push('\n');
        render_table(&mut out, records, currency);
    }
    out
}

fn render_table(out: &mut String, records: &[YearRecord], currency: Currency) {
    let rows = records
        .iter()
        .map(|r| {
            [
                r.age.to_string(),
                format_money(r.start_balance, currency),
                format_delta(r.delta, currency),
                format_money(r.growth, currency),
                format_money(r.end_balance, currency),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = HEADERS.map(str::to_string);
    write_row(out, &header, &widths);
    let rule = widths.map(|w| "-".repeat(w));
    write_row(out, &rule, &widths);
    for row in &rows {
        write_row(out, row, &widths);
    }
}

fn write_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (cell, &width))| {
            // Pad by characters so the euro sign lines up.
            let pad = " ".repeat(width.saturating_sub(cell.chars().count()));
            if idx == 0 {
                format!("{cell}{pad}")
            } else {
                format!("{pad}{cell}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Inputs, project, summarize};

    fn sample_inputs() -> Inputs {
        Inputs {
            current_savings: 1_000.0,
            annual_contribution: 100.0,
            current_age: 60,
            retirement_age: 61,
            expected_return_percent: 5.0,
            expected_inflation_percent: 0.0,
            expected_annual_costs: 200.0,
        }
    }

    #[test]
    fn format_amount_groups_thousands_and_rounds() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.994), "999.99");
        assert_eq!(format_amount(999.995_1), "1,000.00");
        assert_eq!(format_amount(1_234_567.891), "1,234,567.89");
        assert_eq!(format_amount(-58.395_952), "-58.40");
        assert_eq!(format_amount(-0.001), "-0.00");
        assert_eq!(format_amount(-0.0), "-0.00");
        assert_eq!(format_amount(123_456.0), "123,456.00");
    }

    #[test]
    fn format_money_and_delta_use_currency_symbol() {
        assert_eq!(format_money(1_317.75, Currency::Usd), "$1,317.75");
        assert_eq!(format_money(-5.5, Currency::Eur), "€-5.50");
        assert_eq!(format_delta(100.0, Currency::Usd), "+$100.00");
        assert_eq!(format_delta(-2_000.0, Currency::Eur), "-€2,000.00");
    }

    #[test]
    fn currency_parses_from_lowercase_json() {
        let eur: Currency = serde_json::from_str("\"eur\"").expect("eur");
        assert_eq!(eur, Currency::Eur);
        assert_eq!(serde_json::to_string(&Currency::Usd).expect("usd"), "\"usd\"");
    }

    #[test]
    fn render_text_includes_summary_lines_and_table() {
        let inputs = sample_inputs();
        let records = project(&inputs).expect("valid inputs");
        let summary = summarize(&inputs, &records);

        let text = render_text(&summary, &records, Currency::Usd, true);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("You will run out of money at age 69."));
        assert_eq!(
            lines.next(),
            Some("Estimated savings at retirement (age 61): $1,317.75")
        );
        assert_eq!(
            lines.next(),
            Some("Estimated balance at end of simulation: $-58.40")
        );
        assert!(text.contains("Annual Contributions / Deductions"));
        assert!(text.contains("-$200.00"));
        // Summary, blank line, header, rule and one row per year.
        assert_eq!(text.lines().count(), 3 + 1 + 2 + records.len());
    }

    #[test]
    fn render_text_summary_only_skips_table() {
        let inputs = sample_inputs();
        let records = project(&inputs).expect("valid inputs");
        let summary = summarize(&inputs, &records);

        let text = render_text(&summary, &records, Currency::Eur, false);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("€1,317.75"));
        assert!(!text.contains("Start Balance"));
    }
}
