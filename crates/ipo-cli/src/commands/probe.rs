//! `ipo probe`: 소스별 상태 점검.

use crate::context::AppContext;

pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let results = ctx.pipeline.probe().await;

    println!(
        "{:<14} {:<10} {:>4} {:>8}  {}",
        "SOURCE", "ROLE", "PRI", "MS", "RESULT"
    );
    for result in &results {
        let outcome = match &result.outcome {
            Ok(records) => format!("ok ({} records)", records.len()),
            Err(e) => format!("{}: {}", e.kind(), e),
        };
        println!(
            "{:<14} {:<10} {:>4} {:>8}  {}",
            result.source.as_str(),
            result.role.to_string(),
            result.priority,
            result.elapsed.as_millis(),
            outcome
        );
    }

    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
    tracing::info!(sources = results.len(), failed, "소스 점검 완료");

    Ok(())
}
