//! `hearth assemble` — Build the context for a new message in a fixture chat.

use crate::fixture::Fixture;
use crate::runtime::{Runtime, load_config};
use hearth_context::AssemblyRequest;
use hearth_core::{ChatStore, MemorySearch};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub async fn run(config_path: Option<&Path>, fixture_path: &Path, message: &str) -> anyhow::Result<()> {
    let runtime = Runtime::new(load_config(config_path)?);
    let fixture = Fixture::load(fixture_path)?;
    let loaded = fixture.load_stores().await;

    let memory: Arc<dyn MemorySearch> = loaded.memories.clone();
    let assembler = runtime.assembler(Some(memory));

    let history = loaded.chats.get_messages(&fixture.chat.id).await?;
    let (provider, model) = runtime.model(fixture.provider.as_deref(), fixture.model.as_deref());

    let request = AssemblyRequest {
        provider,
        model,
        character: &fixture.character,
        persona: fixture.persona.as_ref(),
        chat: &fixture.chat,
        history: &history,
        user_message: message,
    };
    let context = assembler.assemble(&request).await;

    for warning in &context.warnings {
        warn!("{warning}");
    }
    println!("{}", serde_json::to_string_pretty(&context)?);

    Ok(())
}
