//! Checkpointed title maintenance.
//!
//! A chat's title is reconsidered at interchange counts 2, 3, 5, 7, 10 and
//! then every multiple of 10, each checkpoint at most once. An interchange
//! is one user message paired with one assistant reply.

use super::SkipReason;
use hearth_config::TitleConfig;
use hearth_core::error::StorageError;
use hearth_core::{
    ChatEvent, ChatMetadata, ChatStore, ChatUpdate, CheapGenerator, CheapTask, Result, Role,
    TitleVerdict, render_transcript,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Early interchange counts at which the title is reconsidered.
pub const TITLE_CHECKPOINTS: [usize; 5] = [2, 3, 5, 7, 10];

/// Past the early checkpoints, the title is reconsidered every this many interchanges.
pub const TITLE_CHECK_PERIOD: usize = 10;

/// `min(user messages, assistant messages)` among `message` events.
pub fn calculate_interchange_count(events: &[ChatEvent]) -> usize {
    let (users, assistants) = events
        .iter()
        .filter(|e| e.is_message())
        .fold((0, 0), |(u, a), e| match e.role {
            Role::User => (u + 1, a),
            Role::Assistant => (u, a + 1),
            Role::System => (u, a),
        });
    users.min(assistants)
}

pub fn is_title_checkpoint(interchange: usize) -> bool {
    TITLE_CHECKPOINTS.contains(&interchange)
        || (interchange > TITLE_CHECK_PERIOD && interchange % TITLE_CHECK_PERIOD == 0)
}

/// A checkpoint fires only once, and only moving forward.
pub fn should_check_title_at_interchange(current: usize, last_checked: usize) -> bool {
    current > last_checked && is_title_checkpoint(current)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    Skipped(SkipReason),
    /// Checked at `interchange`, title kept.
    Kept { interchange: usize },
    Renamed { interchange: usize, title: String },
}

/// Title tunables.
#[derive(Debug, Clone)]
pub struct TitleSettings {
    pub enabled: bool,
    /// Messages shown to the cheap model.
    pub recent_messages: usize,
}

impl Default for TitleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            recent_messages: 10,
        }
    }
}

impl From<&TitleConfig> for TitleSettings {
    fn from(config: &TitleConfig) -> Self {
        Self {
            enabled: config.enabled,
            recent_messages: config.recent_messages,
        }
    }
}

pub struct TitleScheduler {
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn CheapGenerator>>,
    settings: TitleSettings,
}

impl TitleScheduler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        generator: Option<Arc<dyn CheapGenerator>>,
        settings: TitleSettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
        }
    }

    /// Reconsider the chat title if the current interchange is a fresh checkpoint.
    ///
    /// On a generation or parse failure the checkpoint is not recorded,
    /// so the next turn at a checkpoint retries.
    pub async fn maybe_rename(&self, chat_id: &str) -> Result<TitleOutcome> {
        if !self.settings.enabled {
            return Ok(TitleOutcome::Skipped(SkipReason::Disabled));
        }
        let Some(generator) = &self.generator else {
            info!(chat_id, "No cheap generator configured, skipping title check");
            return Ok(TitleOutcome::Skipped(SkipReason::NoGenerator));
        };

        let chat: ChatMetadata = self
            .store
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| StorageError::ChatNotFound(chat_id.to_string()))?;
        let events = self.store.get_messages(chat_id).await?;

        let interchange = calculate_interchange_count(&events);
        if !should_check_title_at_interchange(interchange, chat.last_rename_check_interchange) {
            debug!(
                chat_id,
                interchange,
                last = chat.last_rename_check_interchange,
                "Not a title checkpoint"
            );
            return Ok(TitleOutcome::Skipped(SkipReason::NotCheckpoint));
        }

        let turns: Vec<&ChatEvent> = events.iter().filter(|e| e.is_turn()).collect();
        let start = turns.len().saturating_sub(self.settings.recent_messages);
        let task = CheapTask::ReconsiderTitle {
            current_title: chat.title.clone(),
            recent_transcript: render_transcript(turns[start..].iter().copied()),
            context: chat.summary().unwrap_or(&chat.title).to_string(),
        };

        let generation = generator.generate(task).await?;
        let verdict = TitleVerdict::parse(&generation.text)?;

        let new_title = verdict
            .title
            .filter(|t| verdict.rename && *t != chat.title);
        let update = ChatUpdate {
            title: new_title.clone(),
            last_rename_check_interchange: Some(interchange),
            ..Default::default()
        };
        self.store.update(chat_id, update).await?;

        Ok(match new_title {
            Some(title) => {
                info!(chat_id, interchange, title = %title, "Chat renamed");
                TitleOutcome::Renamed { interchange, title }
            }
            None => {
                debug!(chat_id, interchange, "Title kept");
                TitleOutcome::Kept { interchange }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedGenerator;
    use hearth_core::Error;
    use hearth_core::error::GenerationError;
    use hearth_storage::InMemoryChatStore;

    fn exchanges(n: usize) -> Vec<ChatEvent> {
        (0..n)
            .flat_map(|i| {
                [
                    ChatEvent::user(format!("question {i}")),
                    ChatEvent::assistant(format!("answer {i}")),
                ]
            })
            .collect()
    }

    async fn setup(
        chat: ChatMetadata,
        events: Vec<ChatEvent>,
        generator: Arc<ScriptedGenerator>,
    ) -> (Arc<InMemoryChatStore>, TitleScheduler) {
        let store = Arc::new(InMemoryChatStore::new());
        store.insert_chat(chat, events).await;
        let titles = TitleScheduler::new(
            store.clone(),
            Some(generator as Arc<dyn CheapGenerator>),
            TitleSettings::default(),
        );
        (store, titles)
    }

    #[test]
    fn checkpoint_firing() {
        assert!(should_check_title_at_interchange(5, 3));
        assert!(!should_check_title_at_interchange(4, 5));
        assert!(should_check_title_at_interchange(20, 10));
        assert!(!should_check_title_at_interchange(21, 20));
        assert!(!should_check_title_at_interchange(5, 5));
        assert!(!should_check_title_at_interchange(1, 0));
        assert!(should_check_title_at_interchange(10, 7));
        assert!(should_check_title_at_interchange(30, 20));
    }

    #[test]
    fn interchange_counting() {
        let mut events = vec![
            ChatEvent::user("hi"),
            ChatEvent::assistant("hello"),
            ChatEvent::user("how are you"),
        ];
        assert_eq!(calculate_interchange_count(&events), 1);

        events.push(ChatEvent::assistant("fine"));
        assert_eq!(calculate_interchange_count(&events), 2);

        events.insert(2, ChatEvent::context_summary("greetings"));
        assert_eq!(calculate_interchange_count(&events), 2);
    }

    #[tokio::test]
    async fn renames_at_checkpoint() {
        let chat = ChatMetadata::new("c1", "char1", "New Chat");
        let generator = Arc::new(ScriptedGenerator::replies(&[
            r#"{"rename": true, "title": "Storm Over the Lighthouse"}"#,
        ]));
        let (store, titles) = setup(chat, exchanges(3), generator.clone()).await;

        let outcome = titles.maybe_rename("c1").await.unwrap();
        assert_eq!(
            outcome,
            TitleOutcome::Renamed {
                interchange: 3,
                title: "Storm Over the Lighthouse".into()
            }
        );

        let saved = store.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(saved.title, "Storm Over the Lighthouse");
        assert_eq!(saved.last_rename_check_interchange, 3);

        let CheapTask::ReconsiderTitle {
            current_title,
            recent_transcript,
            context,
        } = &generator.tasks()[0]
        else {
            panic!("expected a title task");
        };
        assert_eq!(current_title, "New Chat");
        assert_eq!(context, "New Chat");
        assert_eq!(recent_transcript.lines().count(), 6);
    }

    #[tokio::test]
    async fn keep_still_records_checkpoint() {
        let mut chat = ChatMetadata::new("c1", "char1", "Tea Time");
        chat.context_summary = Some("They drink tea.".into());
        let generator = Arc::new(ScriptedGenerator::replies(&[r#"{"rename": false}"#]));
        let (store, titles) = setup(chat, exchanges(12), generator.clone()).await;

        // 12 is not a checkpoint
        assert_eq!(
            titles.maybe_rename("c1").await.unwrap(),
            TitleOutcome::Skipped(SkipReason::NotCheckpoint)
        );
        assert_eq!(generator.call_count(), 0);

        for e in exchanges(8) {
            store.add_message("c1", e).await.unwrap();
        }

        let outcome = titles.maybe_rename("c1").await.unwrap();
        assert_eq!(outcome, TitleOutcome::Kept { interchange: 20 });
        assert_eq!(generator.call_count(), 1);

        let saved = store.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(saved.title, "Tea Time");
        assert_eq!(saved.last_rename_check_interchange, 20);
    }

    #[tokio::test]
    async fn context_prefers_summary() {
        let mut chat = ChatMetadata::new("c1", "char1", "Tea Time");
        chat.context_summary = Some("They drink tea.".into());
        chat.last_rename_check_interchange = 10;
        let generator = Arc::new(ScriptedGenerator::replies(&[r#"{"rename": false}"#]));
        let (store, titles) = setup(chat, exchanges(20), generator.clone()).await;

        let outcome = titles.maybe_rename("c1").await.unwrap();
        assert_eq!(outcome, TitleOutcome::Kept { interchange: 20 });

        let saved = store.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(saved.title, "Tea Time");
        assert_eq!(saved.last_rename_check_interchange, 20);

        let CheapTask::ReconsiderTitle {
            context,
            recent_transcript,
            ..
        } = &generator.tasks()[0]
        else {
            panic!("expected a title task");
        };
        assert_eq!(context, "They drink tea.");
        assert_eq!(recent_transcript.lines().count(), 10);
    }

    #[tokio::test]
    async fn generation_failure_leaves_checkpoint_unrecorded() {
        let chat = ChatMetadata::new("c1", "char1", "New Chat");
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(
            GenerationError::Network("timeout".into()),
        )]));
        let (store, titles) = setup(chat, exchanges(2), generator).await;

        let err = titles.maybe_rename("c1").await.unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::Network(_))));
        let saved = store.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(saved.last_rename_check_interchange, 0);
    }

    #[tokio::test]
    async fn unparsable_verdict_is_an_error() {
        let chat = ChatMetadata::new("c1", "char1", "New Chat");
        let generator = Arc::new(ScriptedGenerator::replies(&["Sure, rename it to Tea"]));
        let (_store, titles) = setup(chat, exchanges(2), generator).await;

        let err = titles.maybe_rename("c1").await.unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::InvalidOutput(_))));
    }

    #[tokio::test]
    async fn disabled_or_unconfigured_skips() {
        let store = Arc::new(InMemoryChatStore::new());
        store
            .insert_chat(ChatMetadata::new("c1", "char1", "New Chat"), exchanges(2))
            .await;

        let titles = TitleScheduler::new(store.clone(), None, TitleSettings::default());
        assert_eq!(
            titles.maybe_rename("c1").await.unwrap(),
            TitleOutcome::Skipped(SkipReason::NoGenerator)
        );

        let settings = TitleSettings {
            enabled: false,
            ..Default::default()
        };
        let generator: Arc<dyn CheapGenerator> = Arc::new(ScriptedGenerator::new(vec![]));
        let titles = TitleScheduler::new(store, Some(generator), settings);
        assert_eq!(
            titles.maybe_rename("c1").await.unwrap(),
            TitleOutcome::Skipped(SkipReason::Disabled)
        );
    }
}
