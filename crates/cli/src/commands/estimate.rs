//! `storyloom estimate`: Estimate the tokens in a file or stdin.

use std::path::Path;
use storyloom_core::Estimator;

pub async fn run(
    file: Option<&Path>,
    estimator: Estimator,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = super::read_input(file).await?;
    println!("{}", estimator.count(&text));
    Ok(())
}
