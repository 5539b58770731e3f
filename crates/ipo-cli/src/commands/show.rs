//! `ipo show <name>`: 단건 조회.

use crate::context::AppContext;

pub async fn run(ctx: &AppContext, name: &str) -> anyhow::Result<()> {
    match ctx.pipeline.find_listing(name).await? {
        Some(detail) => {
            println!("{}", serde_json::to_string_pretty(&detail)?);
            Ok(())
        }
        None => anyhow::bail!("not found: {}", name),
    }
}
