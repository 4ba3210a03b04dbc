//! Prompt templates for cheap-model housekeeping tasks.
//!
//! Each [`CheapTask`] renders to one system instruction plus one user
//! message carrying the task's material.

use hearth_core::CheapTask;
use hearth_core::generation::MAX_TITLE_CHARS;

const SUMMARIZE_SYSTEM: &str = "You summarize roleplay conversations so they can be continued later. \
Write a concise third-person summary in plain prose. Keep names, relationships, \
promises, unresolved threads and important facts about the user. \
Do not invent events. Do not add commentary or headings.";

const UPDATE_SUMMARY_SYSTEM: &str = "You maintain a running summary of a roleplay conversation. \
You are given the previous summary and the most recent messages. \
Return a single updated summary in plain prose that keeps everything still relevant \
from the previous summary and folds in what is new. Do not add commentary or headings.";

const TITLE_FROM_SUMMARY_SYSTEM: &str = "You name chat conversations. \
Reply with a short, specific title of at most six words for the conversation described. \
Reply with the title only, without quotes or punctuation at the end.";

const RECONSIDER_TITLE_SYSTEM: &str = "You decide whether a chat title still fits its conversation. \
Keep the current title unless it is generic (such as \"New Chat\") or clearly no longer \
describes the conversation. Reply with JSON only, in the form \
{\"rename\": true, \"title\": \"New Title\"} or {\"rename\": false}.";

/// A rendered prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
}

/// Render a task into its prompt pair.
pub fn render(task: &CheapTask) -> Prompt {
    match task {
        CheapTask::Summarize { transcript } => Prompt {
            system: SUMMARIZE_SYSTEM,
            user: format!("Conversation:\n{transcript}\n\nSummary:"),
        },
        CheapTask::UpdateSummary {
            previous_summary,
            recent_transcript,
        } => Prompt {
            system: UPDATE_SUMMARY_SYSTEM,
            user: format!(
                "Previous summary:\n{previous_summary}\n\nRecent messages:\n{recent_transcript}\n\nUpdated summary:"
            ),
        },
        CheapTask::TitleFromSummary { summary } => Prompt {
            system: TITLE_FROM_SUMMARY_SYSTEM,
            user: format!(
                "Conversation summary:\n{summary}\n\nTitle (at most {MAX_TITLE_CHARS} characters):"
            ),
        },
        CheapTask::ReconsiderTitle {
            current_title,
            recent_transcript,
            context,
        } => Prompt {
            system: RECONSIDER_TITLE_SYSTEM,
            user: format!(
                "Current title: {current_title}\n\nContext:\n{context}\n\nRecent messages:\n{recent_transcript}"
            ),
        },
    }
}
