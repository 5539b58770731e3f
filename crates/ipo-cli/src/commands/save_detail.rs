//! `ipo save-detail`: 회사 상세 정보 저장.

use crate::context::AppContext;

pub async fn run(ctx: &AppContext, name: &str, about: &str, financials: &str) -> anyhow::Result<()> {
    let Some(store) = ctx.detail_store() else {
        anyhow::bail!("상세 저장소가 설정되지 않았습니다 (DATABASE_URL 필요)");
    };

    let detail = store.put(name, about, financials).await?;
    tracing::info!(name = %detail.name, updated_at = %detail.updated_at, "상세 정보 저장 완료");
    println!("{}", serde_json::to_string_pretty(&detail)?);

    Ok(())
}
