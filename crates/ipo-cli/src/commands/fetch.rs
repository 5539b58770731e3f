//! `ipo fetch`: 데이터셋 JSON 출력.

use crate::context::AppContext;

pub async fn run(ctx: &AppContext, pretty: bool) -> anyhow::Result<()> {
    let response = ctx.pipeline.fetch_listings().await?;

    let json = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", json);

    let stats = ctx.pipeline.cache().stats();
    tracing::debug!(
        hits = stats.hits,
        misses = stats.misses,
        errors = stats.errors,
        "캐시 통계"
    );

    Ok(())
}
