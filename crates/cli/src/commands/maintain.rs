//! `hearth maintain` — Run the summary and title passes on a fixture chat.

use crate::fixture::Fixture;
use crate::runtime::{Runtime, load_config};
use hearth_context::{SummaryOutcome, TitleOutcome};
use hearth_core::ChatStore;
use std::path::Path;
use std::sync::Arc;

pub async fn run(
    config_path: Option<&Path>,
    fixture_path: &Path,
    force: bool,
    write: bool,
) -> anyhow::Result<()> {
    let runtime = Runtime::new(load_config(config_path)?);
    let Some(generator) = hearth_providers::build_from_config(&runtime.config.cheap_model)? else {
        anyhow::bail!(
            "no cheap model configured (set cheap_model.api_key or HEARTH_API_KEY)"
        );
    };

    let mut fixture = Fixture::load(fixture_path)?;
    let loaded = fixture.load_stores().await;
    let store: Arc<dyn ChatStore> = loaded.chats.clone();
    let scheduler = runtime.scheduler(store, Some(generator));
    let chat_id = fixture.chat.id.clone();

    if force {
        match scheduler.summarizer().regenerate(&chat_id, true).await? {
            SummaryOutcome::Summarized { mode, title, .. } => {
                println!("📝 Summary regenerated ({mode:?})");
                if let Some(title) = title {
                    println!("   Title: {title}");
                }
            }
            SummaryOutcome::Skipped(reason) => println!("📝 Summary skipped: {reason}"),
        }
        match scheduler.titles().maybe_rename(&chat_id).await? {
            TitleOutcome::Renamed { interchange, title } => {
                println!("🏷️  Renamed at interchange {interchange}: {title}")
            }
            TitleOutcome::Kept { interchange } => {
                println!("🏷️  Title kept at interchange {interchange}")
            }
            TitleOutcome::Skipped(reason) => println!("🏷️  Title check skipped: {reason}"),
        }
    } else {
        let (provider, model) =
            runtime.model(fixture.provider.as_deref(), fixture.model.as_deref());
        let tasks = scheduler.after_turn(&chat_id, provider, model);
        let kinds = tasks.kinds();
        tasks.wait().await;

        let stats = scheduler.stats();
        println!(
            "🔧 Ran {} task(s) {:?}, {} failed",
            kinds.len(),
            kinds,
            stats.failed
        );
    }

    if scheduler.failure_count() > 0 {
        println!("   ⚠️  Background failures are logged above");
    }

    fixture.refresh_from(&loaded.chats).await?;
    println!("{}", serde_json::to_string_pretty(&fixture.chat)?);

    if write {
        fixture.save(fixture_path)?;
        println!("💾 Wrote {}", fixture_path.display());
    }

    Ok(())
}
