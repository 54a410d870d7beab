//! `storyloom status`: Per-category size and budget fit.

use super::Workspace;

pub async fn run(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    println!("📚 Storyloom Status");
    println!("===================");
    println!("  Config:     {}", ws.config_path.display());
    println!("  Novel dir:  {}", ws.config.novel_dir.display());
    println!("  Budget:     {} tokens", ws.budget.total());

    if let Some(index) = ws.store.index() {
        match index.record().await {
            Ok(record) => println!("  Chapters:   {} summarized", record.total_chapters),
            Err(e) => println!("  Chapters:   ❌ {e}"),
        }
    }
    println!();

    let reports = ws.store.report(&ws.budget).await;
    let mut issues = 0;
    for report in &reports {
        let ceiling = report
            .ceiling
            .map_or_else(|| "unweighted".to_string(), |c| format!("ceiling {c}"));
        let mark = if report.error.is_some() {
            issues += 1;
            "❌"
        } else if !report.exists {
            "  "
        } else if report.within_budget {
            "✅"
        } else {
            issues += 1;
            "⚠️ "
        };
        println!(
            "  {mark} {:<12} {:>7} tokens (~{:>7} fast)  {ceiling}",
            report.category.as_str(),
            report.tokens,
            report.fast_tokens
        );
        if let Some(error) = &report.error {
            println!("       {error}");
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 Every category fits its share.");
    } else {
        println!("  ⚠️  {issues} category(ies) will be cut or are unreadable.");
    }

    Ok(())
}
