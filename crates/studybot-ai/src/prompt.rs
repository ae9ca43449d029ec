//! Task-context system prompt
//!
//! The assistant only knows about the user's tasks through the system
//! prompt, so the prompt carries a summary (counts, overdue and upcoming
//! work) and one line per task.

use chrono::NaiveDate;

use crate::profile::Task;

/// Days ahead (exclusive of today) counted as "due soon"
const DUE_SOON_DAYS: i64 = 3;

/// Counts derived from a task list relative to `today`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub due_today: usize,
    pub due_soon: usize,
    /// Rounded percentage of completed tasks
    pub completion_rate: u32,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task], today: NaiveDate) -> Self {
        let pending: Vec<&Task> = tasks.iter().filter(|t| !t.completed).collect();
        let completed = tasks.len() - pending.len();

        let days_left = |t: &&Task| (t.due_date - today).num_days();
        let completion_rate = if tasks.is_empty() {
            0
        } else {
            (completed as f64 * 100.0 / tasks.len() as f64).round() as u32
        };

        Self {
            total: tasks.len(),
            completed,
            pending: pending.len(),
            overdue: pending.iter().filter(|t| days_left(t) < 0).count(),
            due_today: pending.iter().filter(|t| days_left(t) == 0).count(),
            due_soon: pending
                .iter()
                .filter(|t| (1..=DUE_SOON_DAYS).contains(&days_left(t)))
                .count(),
            completion_rate,
        }
    }
}

/// Build the system prompt seeded into every conversation.
pub fn build_system_prompt(tasks: &[Task], today: NaiveDate) -> String {
    let stats = TaskStats::from_tasks(tasks, today);

    let mut prompt = String::from(
        "You are \"StudyBot\", a personal study assistant for the StudyPlanner app.\n\
         You have access to the user's real task data. Always respond in the SAME LANGUAGE \
         the user writes in.\n\n",
    );

    prompt.push_str(&format!("Today is: {}\n\n", today.format("%A, %B %-d, %Y")));

    prompt.push_str("Stats:\n");
    prompt.push_str(&format!("- Total tasks: {}\n", stats.total));
    prompt.push_str(&format!("- Completed: {}\n", stats.completed));
    prompt.push_str(&format!("- Pending: {}\n", stats.pending));
    prompt.push_str(&format!("- Completion rate: {}%\n", stats.completion_rate));
    if stats.overdue > 0 {
        prompt.push_str(&format!("- Overdue: {} tasks\n", stats.overdue));
    }
    if stats.due_today > 0 {
        prompt.push_str(&format!("- Due today: {} tasks\n", stats.due_today));
    }
    if stats.due_soon > 0 {
        prompt.push_str(&format!(
            "- Due soon (1-{} days): {} tasks\n",
            DUE_SOON_DAYS, stats.due_soon
        ));
    }

    prompt.push_str("\nPending tasks:\n");
    let pending: Vec<String> = tasks
        .iter()
        .filter(|t| !t.completed)
        .map(|t| {
            let mut line = format!(
                "- \"{}\" | Subject: {} | Due: {} | Priority: {}",
                t.title, t.subject, t.due_date, t.priority
            );
            if !t.description.is_empty() {
                line.push_str(&format!(" | Note: {}", t.description));
            }
            line
        })
        .collect();
    if pending.is_empty() {
        prompt.push_str("User has no pending tasks\n");
    } else {
        prompt.push_str(&pending.join("\n"));
        prompt.push('\n');
    }

    if stats.completed > 0 {
        prompt.push_str("\nCompleted tasks:\n");
        for t in tasks.iter().filter(|t| t.completed) {
            prompt.push_str(&format!(
                "- \"{}\" | Subject: {} | Due: {}\n",
                t.title, t.subject, t.due_date
            ));
        }
    }

    prompt.push_str(
        "\nGuidelines:\n\
         1. Keep answers concise\n\
         2. Reference real task data when answering about tasks\n\
         3. Give actionable, practical advice\n\
         4. Gently remind about overdue tasks\n\
         5. Be encouraging, not pressuring\n\
         6. For study tips, tailor to the user's actual subjects\n\
         7. Never fabricate tasks that don't exist in the list\n\
         8. Use /no_think mode for faster responses",
    );

    prompt
}

/// Greeting shown before the first turn.
pub fn welcome_message(tasks: &[Task], today: NaiveDate) -> String {
    let stats = TaskStats::from_tasks(tasks, today);
    let greeting = "Hi! I'm StudyBot, your study assistant.";

    if stats.pending == 0 {
        return format!(
            "{greeting}\nYou have no pending tasks yet. Add some in the planner and come back to chat!"
        );
    }

    let mut message = format!(
        "{greeting}\nAsk me about your tasks, for a study plan, or for study tips!"
    );
    if stats.overdue > 0 {
        message.push_str(&format!(
            "\n\nYou have {} overdue task{}. Ask me how to catch up!",
            stats.overdue,
            if stats.overdue == 1 { "" } else { "s" }
        ));
    }
    message
}
