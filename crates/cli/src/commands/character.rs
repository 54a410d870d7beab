//! `storyloom character`: Add or rewrite one character's section.

use super::{Workspace, read_input};
use std::path::Path;

pub async fn run(
    ws: &Workspace,
    name: &str,
    file: Option<&Path>,
    add: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let description = read_input(file).await?;

    if add {
        ws.store.add_character(name, &description).await?;
        println!("✅ Added character {}", name.trim());
    } else {
        ws.store.update_character(name, &description).await?;
        println!("✅ Updated character {}", name.trim());
    }

    let names = ws.store.character_names().await?;
    println!("   {} character(s): {}", names.len(), names.join(", "));
    Ok(())
}
