use anyhow::{Context, Result};
use spiral_core::archive::CardRecord;

use crate::commands::open_project;

/// Store a memory card in the project archive.
pub fn add_card_command(root: &str, id: &str, topic: &str, content: &str) -> Result<()> {
    let ctx = open_project(root)?;
    let card = CardRecord::new(id, topic, content);
    let row = ctx.archive.insert_card(&card).context("Failed to insert memory card")?;

    println!("Added memory card:");
    println!("  Row: {row}");
    println!("  Id: card:{}", card.id);
    println!("  Topic: {}", card.topic);
    println!("  Archive: {}", ctx.archive_path.display());
    Ok(())
}

/// List every card in the project archive, oldest first.
pub fn list_cards_command(root: &str, json: bool) -> Result<()> {
    let ctx = open_project(root)?;
    let cards = ctx.archive.list_cards().context("Failed to list memory cards")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }
    if cards.is_empty() {
        println!("No memory cards.");
        return Ok(());
    }
    println!("Memory cards:");
    for card in &cards {
        println!("- card:{} [{}] {}", card.id, card.topic, card.content);
    }
    Ok(())
}
