//! `storyloom assemble`: Print the budgeted context.

use super::Workspace;
use storyloom_context::ContextAssembler;

pub async fn run(ws: Workspace, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let assembler = ContextAssembler::new(ws.store);
    let context = assembler.assemble(&ws.budget).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&context)?);
    } else {
        println!("{}", context.formatted);
    }

    let meta = &context.metadata;
    eprintln!(
        "\n{} / {} tokens ({:.1}%)",
        meta.total_tokens, meta.budget, meta.utilization_pct
    );
    for stats in meta.per_section.iter().filter(|s| s.truncated) {
        eprintln!(
            "  ✂️  {} cut from {} to {} tokens (ceiling {})",
            stats.category, stats.source_tokens, stats.tokens, stats.ceiling
        );
    }
    for failure in &meta.failures {
        eprintln!("  ⚠️  {} unavailable: {}", failure.category, failure.error);
    }

    Ok(())
}
