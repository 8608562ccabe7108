//! Action queue generation — three declarative rules over current state,
//! then a stable priority sort and a hard cap.
//!
//! Rules run in a fixed order (follow-up, review, send) and each pulls a
//! bounded slice of rows. The final sort is stable, so ties within a
//! priority band keep rule order and each rule's internal ordering.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::DatabaseError;
use crate::store::Database;
use crate::store::model::Lead;
use crate::tasks::model::{ActionTask, TaskKind, TaskPriority};

/// The queue never surfaces more than this many tasks.
const MAX_TASKS: usize = 5;
/// Leads younger than this many days are not follow-up candidates.
const FOLLOWUP_MIN_DAYS: i64 = 3;
const FOLLOWUP_LIMIT: usize = 5;
const REVIEW_LIMIT: usize = 5;
const SEND_LIMIT: usize = 3;

/// Build the action queue for one user from current persisted state.
pub async fn tasks_for_user(
    db: &Arc<dyn Database>,
    user_id: &str,
) -> Result<Vec<ActionTask>, DatabaseError> {
    let mut tasks = Vec::new();

    // Rule 1: follow-ups — stale leads the user never actually wrote to
    let candidates = db
        .followup_candidates(user_id, FOLLOWUP_MIN_DAYS, FOLLOWUP_LIMIT)
        .await?;
    for lead in &candidates {
        tasks.push(followup_task(lead));
    }

    // Rule 2: review AI drafts
    let mut review_message_ids = HashSet::new();
    let ai_drafts = db.recent_ai_drafts(user_id, REVIEW_LIMIT).await?;
    for draft in &ai_drafts {
        review_message_ids.insert(draft.id.clone());
        let priority = if draft.lead_id.is_some() {
            TaskPriority::High
        } else {
            TaskPriority::Medium
        };
        tasks.push(
            ActionTask::new(
                TaskKind::Review,
                &draft.id,
                &format!("Review AI draft: {}", display_subject(&draft.subject)),
                "An AI-generated reply is waiting for your review.",
            )
            .with_lead(draft.lead_id.clone())
            .with_message(&draft.id)
            .with_priority(priority),
        );
    }

    // Rule 3: send hand-written drafts, minus anything the review rule
    // already claimed
    let manual_drafts = db.recent_manual_drafts(user_id, SEND_LIMIT).await?;
    for draft in &manual_drafts {
        if review_message_ids.contains(&draft.id) {
            continue;
        }
        tasks.push(
            ActionTask::new(
                TaskKind::Send,
                &draft.id,
                &format!("Send draft: {}", display_subject(&draft.subject)),
                "A draft reply is ready to send.",
            )
            .with_lead(draft.lead_id.clone())
            .with_message(&draft.id)
            .with_priority(TaskPriority::Medium),
        );
    }

    // Stable sort keeps rule order within a priority band
    tasks.sort_by_key(|t| t.priority.rank());
    tasks.truncate(MAX_TASKS);

    debug!(user_id = %user_id, count = tasks.len(), "Action queue built");
    Ok(tasks)
}

fn followup_task(lead: &Lead) -> ActionTask {
    let days = lead.days_since_contact.unwrap_or(0);
    let priority = if days >= 7 {
        TaskPriority::High
    } else if days >= 5 {
        TaskPriority::Medium
    } else {
        TaskPriority::Low
    };

    let who = lead.name.as_deref().unwrap_or(&lead.email);
    ActionTask::new(
        TaskKind::Followup,
        &lead.id,
        &format!("Follow up with {who}"),
        &format!("No reply sent in {days} days."),
    )
    .with_lead(Some(lead.id.clone()))
    .with_priority(priority)
}

fn display_subject(subject: &str) -> &str {
    if subject.trim().is_empty() {
        "(no subject)"
    } else {
        subject
    }
}
