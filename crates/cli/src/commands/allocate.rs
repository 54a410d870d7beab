//! `storyloom allocate`: Show how the budget divides across categories.

use super::Workspace;
use storyloom_core::Budget;

pub fn run(ws: &Workspace, total: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let budget = match total {
        Some(total) => Budget::new(total, ws.budget.weights().clone())?,
        None => ws.budget.clone(),
    };
    let allocation = budget.allocate();

    println!("📊 Allocation of {} tokens", budget.total());
    println!("==========================");
    for (category, ceiling) in allocation.iter() {
        let weight = budget.weights().get(category).unwrap_or_default();
        println!("  {:<12} {:>6.1}%  {:>8}", category.as_str(), weight * 100.0, ceiling);
    }
    println!("  {:<12} {:>7}  {:>8}", "total", "", allocation.total());

    if allocation.total() > budget.total() {
        println!(
            "\n  ⚠️  Minimum shares overshoot the budget by {} tokens",
            allocation.total() - budget.total()
        );
    }

    Ok(())
}
