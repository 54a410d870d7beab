//! `storyloom update` / `storyloom append`: Write through the store.

use super::{Workspace, read_input};
use std::path::Path;
use storyloom_core::Category;

pub async fn update(
    ws: &Workspace,
    category: &str,
    file: Option<&Path>,
    backup: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let category = Category::new(category)?;
    let text = read_input(file).await?;

    if backup && let Some(path) = ws.store.backup(&category).await? {
        println!("  Backed up to {}", path.display());
    }

    ws.store.update(&category, &text).await?;
    println!("✅ Updated {category} ({} bytes)", text.len());
    Ok(())
}

pub async fn append(
    ws: &Workspace,
    category: &str,
    file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let category = Category::new(category)?;
    let text = read_input(file).await?;

    ws.store.append(&category, &text).await?;
    println!("✅ Appended to {category} ({} bytes)", text.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(dir: &Path) -> Workspace {
        let missing = dir.join("no-config.toml");
        Workspace::open(Some(&missing), Some(dir)).unwrap()
    }

    #[tokio::test]
    async fn update_then_append_from_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        let first = tmp.path().join("a.txt");
        let second = tmp.path().join("b.txt");
        std::fs::write(&first, "Act one.").unwrap();
        std::fs::write(&second, "Act two.").unwrap();

        update(&ws, "plan", Some(&first), false).await.unwrap();
        append(&ws, "plan", Some(&second)).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("plan.md")).unwrap(),
            "Act one.\n\nAct two."
        );
    }

    #[tokio::test]
    async fn update_with_backup_keeps_the_old_file() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        std::fs::write(tmp.path().join("worldview.md"), "Old map.").unwrap();
        let input = tmp.path().join("new.txt");
        std::fs::write(&input, "New map.").unwrap();

        update(&ws, "worldview", Some(&input), true).await.unwrap();

        let backups: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("worldview.md.backup."))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read_to_string(backups[0].path()).unwrap(), "Old map.");
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        let input = tmp.path().join("x.txt");
        std::fs::write(&input, "text").unwrap();
        assert!(update(&ws, "villains", Some(&input), false).await.is_err());
        assert!(update(&ws, "Bad Name", Some(&input), false).await.is_err());
    }
}
