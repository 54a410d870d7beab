//! `storyloom summary` / `storyloom title`: Index helpers.

use super::Workspace;
use storyloom_store::{ChapterSummary, IndexContent};

fn index(ws: &Workspace) -> Result<&IndexContent, Box<dyn std::error::Error>> {
    ws.store
        .index()
        .ok_or_else(|| "No index registered for this novel".into())
}

pub async fn summary(
    ws: &Workspace,
    chapter_id: String,
    text: String,
    title: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut entry = ChapterSummary::new(chapter_id, text);
    if let Some(title) = title {
        entry.title = title;
    }
    let chapter_id = entry.chapter_id.clone();

    let record = index(ws)?.upsert_summary(entry).await?;
    println!(
        "✅ Saved summary for {chapter_id} ({} chapter(s) indexed)",
        record.total_chapters
    );
    Ok(())
}

pub async fn title(ws: &Workspace, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    index(ws)?.set_title(text).await?;
    println!("✅ Title set to \"{}\"", text.trim());
    Ok(())
}
