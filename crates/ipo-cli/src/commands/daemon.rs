//! `ipo daemon`: 주기적 데이터셋 갱신.

use ipo_core::DaemonConfig;

use crate::context::AppContext;

pub async fn run(ctx: &AppContext, config: &DaemonConfig) -> anyhow::Result<()> {
    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}분) ===",
        config.interval_minutes
    );

    let mut interval = tokio::time::interval(config.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                match ctx.pipeline.refresh().await {
                    Ok(response) if response.is_degraded() => {
                        tracing::warn!("데이터셋 갱신: 사용 가능한 소스 없음");
                    }
                    Ok(response) => {
                        tracing::info!(records = response.total(), "데이터셋 갱신 완료");
                    }
                    Err(e) => {
                        tracing::error!("데이터셋 갱신 실패: {}", e);
                    }
                }

                tracing::info!(
                    "=== 다음 갱신: {}분 후 ===",
                    config.interval_minutes
                );
            }
        }
    }

    Ok(())
}
