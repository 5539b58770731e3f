//! IPO 상장 정보 수집기 CLI.

mod commands;
mod context;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ipo_core::{init_logging, AppConfig, LogConfig};
use std::path::PathBuf;

use crate::context::AppContext;

#[derive(Parser)]
#[command(name = "ipo")]
#[command(about = "IPO listing aggregator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일보다 우선
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 데이터셋 조회 (캐시 우선) 후 JSON 출력
    Fetch {
        /// 들여쓰기 출력
        #[arg(long)]
        pretty: bool,
    },

    /// 단건 조회 (이름 또는 정규화 키)
    Show {
        /// 회사 이름
        name: String,
    },

    /// 모든 소스를 한 번씩 호출하고 결과 요약 출력
    Probe,

    /// 회사 상세 정보 저장 (upsert)
    SaveDetail {
        /// canonical 회사 이름
        name: String,
        /// 회사 소개
        #[arg(long)]
        about: String,
        /// 재무 요약
        #[arg(long)]
        financials: String,
    },

    /// 데몬 모드: 주기적으로 데이터셋 갱신
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!(config = %cli.config.display(), "IPO 수집기 시작");

    let ctx = AppContext::build(&config).await?;

    let result = match cli.command {
        Commands::Fetch { pretty } => commands::fetch::run(&ctx, pretty).await,
        Commands::Show { name } => commands::show::run(&ctx, &name).await,
        Commands::Probe => commands::probe::run(&ctx).await,
        Commands::SaveDetail {
            name,
            about,
            financials,
        } => commands::save_detail::run(&ctx, &name, &about, &financials).await,
        Commands::Daemon => commands::daemon::run(&ctx, &config.daemon).await,
    };

    ctx.shutdown().await;
    tracing::info!("IPO 수집기 종료");

    result
}
