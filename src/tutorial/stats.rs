//! Aggregate tutorial statistics, derived on demand from a snapshot.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::ProgressRecord;

/// Completion and abandonment figures across all records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TutorialStats {
    pub total_users: usize,
    pub completed_users: usize,
    /// completed / total, 0 when there are no users.
    pub completion_rate: f64,
    /// Mean start-to-completion time over completed records, 0 when none.
    pub average_completion_time_hours: f64,
    /// Per step: 1 - completed / reached. Absent when nobody reached the step.
    pub step_abandonment_rate: BTreeMap<usize, f64>,
    /// Per step: mean feedback score. Absent when nobody rated the step.
    pub average_feedback_score: BTreeMap<usize, f64>,
}

impl TutorialStats {
    /// Compute statistics for a catalog of `total_steps` steps.
    ///
    /// A user reached step `i` if their `current_step >= i` or `i` is in their
    /// completed steps; they completed it only if `i` is in their completed
    /// steps, so skipped steps count as reached but not completed.
    pub fn compute(records: &[ProgressRecord], total_steps: usize) -> Self {
        let total_users = records.len();
        if total_users == 0 {
            return Self::default();
        }

        let completion_hours: Vec<f64> = records
            .iter()
            .filter_map(ProgressRecord::completion_hours)
            .collect();
        let completed_users = completion_hours.len();

        let average_completion_time_hours = if completion_hours.is_empty() {
            0.0
        } else {
            completion_hours.iter().sum::<f64>() / completion_hours.len() as f64
        };

        let mut step_abandonment_rate = BTreeMap::new();
        let mut average_feedback_score = BTreeMap::new();

        for step in 0..total_steps {
            let reached = records
                .iter()
                .filter(|r| r.current_step >= step || r.completed_steps.contains(&step))
                .count();
            let completed = records
                .iter()
                .filter(|r| r.completed_steps.contains(&step))
                .count();
            if reached > 0 {
                step_abandonment_rate.insert(step, 1.0 - completed as f64 / reached as f64);
            }

            let scores: Vec<u8> = records
                .iter()
                .filter_map(|r| r.feedback_scores.get(&step).copied())
                .collect();
            if !scores.is_empty() {
                let sum: u32 = scores.iter().map(|s| u32::from(*s)).sum();
                average_feedback_score.insert(step, f64::from(sum) / scores.len() as f64);
            }
        }

        Self {
            total_users,
            completed_users,
            completion_rate: completed_users as f64 / total_users as f64,
            average_completion_time_hours,
            step_abandonment_rate,
            average_feedback_score,
        }
    }

    /// The step with the highest abandonment rate, if any step was reached.
    ///
    /// Ties go to the earliest step.
    pub fn worst_abandonment_step(&self) -> Option<(usize, f64)> {
        self.step_abandonment_rate
            .iter()
            .fold(None, |worst: Option<(usize, f64)>, (&step, &rate)| match worst {
                Some((_, worst_rate)) if worst_rate >= rate => worst,
                _ => Some((step, rate)),
            })
    }

    /// Mean of the per-step feedback averages.
    pub fn overall_feedback_score(&self) -> Option<f64> {
        if self.average_feedback_score.is_empty() {
            return None;
        }
        let sum: f64 = self.average_feedback_score.values().sum();
        Some(sum / self.average_feedback_score.len() as f64)
    }
}
