//! `storyloom init`: Write a default config and create the novel directory.

use super::config_path;
use std::path::Path;
use storyloom_config::AppConfig;

pub async fn run(
    config: Option<&Path>,
    dir: Option<&Path>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path(config);

    println!("📚 Storyloom: Setup");
    println!("====================\n");

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut novel_dir = AppConfig::default().novel_dir;
    if config_path.exists() && !force {
        println!("  ⚠️  Config already exists at: {}", config_path.display());
        println!("     Pass --force to overwrite it.");
        if let Ok(existing) = AppConfig::load_from(&config_path) {
            novel_dir = existing.novel_dir;
        }
    } else {
        tokio::fs::write(&config_path, AppConfig::default_toml()).await?;
        println!("✅ Created config at: {}", config_path.display());
    }

    if let Some(dir) = dir {
        novel_dir = dir.to_path_buf();
    }
    if novel_dir.exists() {
        println!("  Novel directory exists: {}", novel_dir.display());
    } else {
        tokio::fs::create_dir_all(&novel_dir).await?;
        println!("✅ Created novel directory: {}", novel_dir.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. Adjust [budget.weights] in {}", config_path.display());
    println!("   2. Add content: storyloom update plan outline.md");
    println!("   3. Run: storyloom assemble\n");

    Ok(())
}
