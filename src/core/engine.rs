use std::iter::FusedIterator;

use super::types::{EntryKind, Inputs, ProjectionError, ProjectionSummary, YearRecord};

/// Last simulated age. The year in which this age is reached is always the
/// final record.
pub const MAX_AGE: u32 = 100;

/// Lazy year-by-year projection. Yields at most `MAX_AGE - current_age + 1`
/// records and cannot be restarted once drained.
#[derive(Debug, Clone)]
pub struct Projection {
    age: u32,
    retirement_age: u32,
    balance: f64,
    contribution: f64,
    cost: f64,
    return_rate: f64,
    inflation_rate: f64,
    finished: bool,
}

pub fn projection(inputs: &Inputs) -> Result<Projection, ProjectionError> {
    if inputs.retirement_age <= inputs.current_age {
        return Err(ProjectionError::InvalidInput {
            current_age: inputs.current_age,
            retirement_age: inputs.retirement_age,
        });
    }

    Ok(Projection {
        age: inputs.current_age,
        retirement_age: inputs.retirement_age,
        balance: inputs.current_savings,
        contribution: inputs.annual_contribution,
        cost: inputs.expected_annual_costs,
        return_rate: inputs.return_rate(),
        inflation_rate: inputs.inflation_rate(),
        finished: false,
    })
}

pub fn project(inputs: &Inputs) -> Result<Vec<YearRecord>, ProjectionError> {
    Ok(projection(inputs)?.collect())
}

impl Projection {
    fn step(&mut self) -> YearRecord {
        let age = self.age;
        let (delta, kind) = if age <= self.retirement_age {
            (self.contribution, EntryKind::Contribution)
        } else {
            (-self.cost, EntryKind::Deduction)
        };

        let invested = self.balance + delta;
        let record = YearRecord {
            age,
            start_balance: self.balance,
            delta,
            growth: invested * self.return_rate,
            end_balance: invested * (1.0 + self.return_rate),
            kind,
        };

        self.balance = record.end_balance;
        self.contribution *= 1.0 + self.inflation_rate;
        self.cost *= 1.0 + self.inflation_rate;

        let depleted = age > self.retirement_age && record.end_balance <= 0.0;
        if depleted || age >= MAX_AGE {
            self.finished = true;
        }
        self.age = age.saturating_add(1);
        record
    }
}

impl Iterator for Projection {
    type Item = YearRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        Some(self.step())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let ceiling = MAX_AGE.saturating_sub(self.age) as usize + 1;
        (1, Some(ceiling))
    }
}

impl FusedIterator for Projection {}

pub fn summarize(inputs: &Inputs, records: &[YearRecord]) -> ProjectionSummary {
    let savings_at_retirement = records
        .iter()
        .find(|r| r.age == inputs.retirement_age)
        .map(|r| r.end_balance);
    let depletion_age = records
        .iter()
        .find(|r| r.age > inputs.retirement_age && r.end_balance <= 0.0)
        .map(|r| r.age);
    let final_balance = records
        .last()
        .map(|r| r.end_balance)
        .unwrap_or(inputs.current_savings);

    ProjectionSummary {
        retirement_age: inputs.retirement_age,
        savings_at_retirement,
        depletion_age,
        final_balance,
        years: records.len(),
    }
}

/// Single-shot compound estimate: each year the contribution is added and the
/// total then grows at the expected return. No inflation, no withdrawals.
pub fn compound_savings(
    current_savings: f64,
    annual_contribution: f64,
    expected_return_percent: f64,
    years: u32,
) -> f64 {
    let rate = expected_return_percent / 100.0;
    (0..years).fold(current_savings, |total, _| {
        (total + annual_contribution) * (1.0 + rate)
    })
}
