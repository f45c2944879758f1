use domain::{Priority, Todo};
use infrastructure::UserProfile;

/// リマインダーメールの件名と本文を組み立てる
pub fn reminder_email(todo: &Todo, profile: &UserProfile) -> (String, String) {
    let subject = format!("Reminder: {}", todo.title);
    let body = format!(
        "Hello {},\n\n\
         This is a reminder that your todo task is due now:\n\n\
         {}\n\n\
         Please complete this task as soon as possible.\n\n\
         Best regards,\n\
         Todo Tracker Team",
        profile.display_name,
        task_summary(todo),
    );
    (subject, body)
}

/// フォローアップメールの件名と本文を組み立てる
pub fn followup_email(todo: &Todo, profile: &UserProfile) -> (String, String) {
    let subject = format!("Action Required: Overdue Task - {}", todo.title);
    let body = format!(
        "Hello {},\n\n\
         Your todo task is overdue and still not completed:\n\n\
         {}\n\n\
         Please mark this task as complete if you have finished it, \
         or update the due date if you need more time.\n\n\
         Best regards,\n\
         Todo Tracker Team",
        profile.display_name,
        task_summary(todo),
    );
    (subject, body)
}

fn task_summary(todo: &Todo) -> String {
    let mut lines = vec![
        format!("Title: {}", todo.title),
        format!("Priority: {}", priority_label(todo.priority)),
    ];
    if let Some(due) = todo.due_datetime {
        lines.push(format!(
            "Due Date & Time: {}",
            due.format("%B %d, %Y at %I:%M %p")
        ));
    }
    if let Some(description) = &todo.description {
        lines.push(format!("Description: {description}"));
    }
    lines.join("\n")
}

fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}
