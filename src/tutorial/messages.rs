//! Plain-text messages sent to users and channels.
//!
//! The transport layer is free to decorate these (embeds, colors); nothing
//! here assumes a particular chat platform.

use super::catalog::{StepCatalog, TutorialStep};
use super::model::ProgressRecord;
use super::stats::TutorialStats;
use crate::error::TutorialError;

/// Reaction that starts the tutorial from the welcome post.
pub const START_EMOJI: &str = "🎓";

/// How to address a user in text.
fn display_name(record: &ProgressRecord) -> &str {
    record.username.as_deref().unwrap_or(&record.user_id)
}

/// Channel post greeting a new member.
pub fn welcome(name: &str) -> String {
    format!(
        "🎉 Welcome, {name}!\n\
         We'll walk you through how this server works, one step at a time.\n\
         React with {START_EMOJI} or say `start` to begin the tutorial.\n\
         Say `help` any time if you get stuck."
    )
}

/// Direct message sent to a new member alongside the channel welcome.
pub fn greeting() -> String {
    format!(
        "👋 Hi! I can help here in direct messages too.\n\
         Ask me anything, or say `start` (or react with {START_EMOJI} on the welcome post) \
         to begin the tutorial."
    )
}

/// One tutorial step, shown when the user arrives at it.
pub fn step(step: &TutorialStep, total_steps: usize) -> String {
    format!(
        "{} {} (step {}/{})\n{}\n\nTry this: {}\n\n\
         Say `next` or `done` when you're finished, or `skip` to skip this step.",
        step.emoji,
        step.title,
        step.index + 1,
        total_steps,
        step.description,
        step.action_prompt
    )
}

/// The current step for a record, or the completion note when finished.
pub fn current_step(record: &ProgressRecord, catalog: &StepCatalog) -> String {
    match catalog.get(record.current_step) {
        Some(s) => step(s, catalog.len()),
        None => "You've already finished the tutorial. Say `feedback` to rate the steps."
            .to_string(),
    }
}

pub fn help() -> String {
    [
        "🆘 Tutorial help",
        "• `next` / `done`: finish the current step",
        "• `skip`: skip the current step",
        "• `pause`: pause the tutorial (no reminders while paused)",
        "• `resume`: pick up where you left off",
        "• `status`: see your progress",
        "• `stats`: see how everyone is doing",
        "• `feedback`: rate the steps you've completed",
        "• `<step> <score>`: rate a step from 1 to 5, e.g. `1 5`",
        "",
        "Can't find a channel? Names differ between servers, look for a similar one.",
        "Missing permissions? Some features unlock after you've been here a while.",
    ]
    .join("\n")
}

/// Direct message sent when the final step is left.
pub fn completion(record: &ProgressRecord, total_steps: usize) -> String {
    let hours = record.completion_hours().unwrap_or(0.0);
    format!(
        "🎉 Tutorial complete! Great work, {}.\n\
         • Time taken: {:.1} hours\n\
         • Steps completed: {}/{}\n\
         • Reminders received: {}\n\n\
         Help us improve: say `feedback` to rate the steps.",
        display_name(record),
        hours,
        record.completed_steps.len(),
        total_steps,
        record.reminder_count
    )
}

/// Channel post announcing a finished tutorial.
pub fn completion_announcement(record: &ProgressRecord) -> String {
    format!(
        "🎉 {} just finished the tutorial! Give them a warm welcome.",
        display_name(record)
    )
}

/// Nudge for a user who has gone quiet.
pub fn reminder(record: &ProgressRecord, catalog: &StepCatalog) -> String {
    let mut text = format!(
        "📢 Hi {}, want to pick the tutorial back up?",
        display_name(record)
    );
    if let Some(s) = catalog.get(record.current_step) {
        text.push_str(&format!(
            "\n\nCurrent step: {} {}\n{}\nTo do: {}",
            s.emoji, s.title, s.description, s.action_prompt
        ));
    }
    text.push_str("\n\nSay `next` or `done` to continue, or `pause` to stop these reminders.");
    text
}

pub fn paused() -> String {
    "⏸️ Tutorial paused. No reminders until you say `resume`.".to_string()
}

pub fn already_paused() -> String {
    "Your tutorial is already paused. Say `resume` to continue.".to_string()
}

pub fn resumed(record: &ProgressRecord, catalog: &StepCatalog) -> String {
    format!("▶️ Welcome back!\n\n{}", current_step(record, catalog))
}

/// Lists completed steps so the user can rate them.
pub fn feedback_prompt(record: &ProgressRecord, catalog: &StepCatalog) -> String {
    if record.completed_steps.is_empty() {
        return "You haven't completed any steps yet. Come back once you have!".to_string();
    }
    let mut lines = vec!["📝 How useful was each step? Rate it from 1 to 5.".to_string()];
    for index in &record.completed_steps {
        if let Some(s) = catalog.get(*index) {
            let rated = record
                .feedback_scores
                .get(index)
                .map(|score| format!(" (you said {score})"))
                .unwrap_or_default();
            lines.push(format!("• {}. {} {}{}", index + 1, s.emoji, s.title, rated));
        }
    }
    lines.push("Reply like `1 5` (step 1, score 5).".to_string());
    lines.join("\n")
}

pub fn feedback_thanks(step: Option<&TutorialStep>, score: u8) -> String {
    match step {
        Some(s) => format!("Thanks! You gave \"{}\" a {score}.", s.title),
        None => format!("Thanks for the {score}!"),
    }
}

/// A user's own progress.
pub fn status(record: &ProgressRecord, catalog: &StepCatalog) -> String {
    let total = catalog.len();
    let mut lines = vec![format!("📊 Progress for {}", display_name(record))];
    if record.is_completed() {
        lines.push(format!("• Finished all {total} steps"));
    } else {
        lines.push(format!(
            "• Current step: {}/{}",
            (record.current_step + 1).min(total),
            total
        ));
    }
    lines.push(format!("• Steps completed: {}", record.completed_steps.len()));
    lines.push(format!(
        "• Started: {}",
        record.started_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if let (Some(done), Some(hours)) = (record.completion_time, record.completion_hours()) {
        lines.push(format!(
            "• Completed: {} ({hours:.1} hours)",
            done.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    if record.is_paused {
        lines.push("• Paused".to_string());
    }
    if let Some(avg) = record.average_feedback() {
        lines.push(format!(
            "• Average rating: {avg:.1}/5.0 ({} steps rated)",
            record.feedback_scores.len()
        ));
    }
    lines.join("\n")
}

/// Server-wide statistics.
pub fn stats(stats: &TutorialStats, catalog: &StepCatalog) -> String {
    let mut lines = vec![
        "📈 Tutorial statistics".to_string(),
        format!("• Users: {}", stats.total_users),
        format!("• Finished: {}", stats.completed_users),
        format!("• Completion rate: {:.1}%", stats.completion_rate * 100.0),
    ];
    if stats.average_completion_time_hours > 0.0 {
        lines.push(format!(
            "• Average time to finish: {:.1} hours",
            stats.average_completion_time_hours
        ));
    }
    if let Some(avg) = stats.overall_feedback_score() {
        lines.push(format!("• Average rating: {avg:.1}/5.0"));
    }
    if let Some((index, rate)) = stats.worst_abandonment_step()
        && rate > 0.0
    {
        let title = catalog.get(index).map(|s| s.title.as_str()).unwrap_or("?");
        lines.push(format!(
            "• Most abandoned: step {} \"{}\" ({:.1}%)",
            index + 1,
            title,
            rate * 100.0
        ));
    }
    lines.join("\n")
}

/// Reply for a failed command.
pub fn error(err: &TutorialError) -> String {
    match err {
        TutorialError::NoActiveTutorial { .. } => {
            "You don't have a tutorial in progress. Say `start` to begin, or `resume` if you paused it."
                .to_string()
        }
        TutorialError::InvalidStep { total, .. } => {
            format!("That step doesn't exist. Pick a step between 1 and {total}.")
        }
        TutorialError::InvalidScore { .. } => "Scores go from 1 to 5.".to_string(),
        _ => "Something went wrong saving your progress. Please try again in a moment."
            .to_string(),
    }
}
