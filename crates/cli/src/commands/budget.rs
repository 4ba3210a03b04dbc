//! `hearth budget` — Token budget for a model.

use crate::runtime::{Runtime, load_config};
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    provider: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let runtime = Runtime::new(load_config(config_path)?);
    let (provider, model) = runtime.model(provider.as_deref(), model.as_deref());

    let budget = runtime.budgets.calculate(provider, model);
    let allocation = runtime.budgets.allocation(provider, model);

    println!("📐 {provider}/{model}");
    println!("   Context window:   {}", budget.total_limit);
    println!(
        "   System prompt:    {:>6}  ({:.0}%)",
        budget.system_prompt_budget,
        allocation.system * 100.0
    );
    println!(
        "   Memories:         {:>6}  ({:.0}%)",
        budget.memory_budget,
        allocation.memory * 100.0
    );
    println!(
        "   Summary:          {:>6}  ({:.0}%)",
        budget.summary_budget,
        allocation.summary * 100.0
    );
    println!(
        "   Recent messages:  {:>6}  ({:.0}%)",
        budget.recent_messages_budget,
        allocation.recent * 100.0
    );
    println!(
        "   Response reserve: {:>6}  ({:.0}%)",
        budget.response_reserve,
        allocation.reserve * 100.0
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&budget)?);

    Ok(())
}
