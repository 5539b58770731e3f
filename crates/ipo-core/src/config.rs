//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → 환경 변수 순으로 덮어씁니다.
//! 환경 변수는 `IPO__` 접두사와 `__` 구분자를 사용합니다
//! (예: `IPO__CACHE__TTL_SECS=600`).
//!
//! API 키, Redis URL, DB URL 같은 비밀 값은 설정 파일이 아니라 환경 변수로
//! 주입합니다. 기존 배포와의 호환을 위해 `IPO_ALERTS_API_KEY`, `REDIS_URL`,
//! `DATABASE_URL`도 인식합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 데이터 소스 설정
    pub sources: SourcesConfig,
    /// 캐시 설정
    pub cache: CacheConfig,
    /// 수익률 보강 설정
    pub enrichment: EnrichmentConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 데이터 소스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// 소스별 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// HTTP User-Agent
    pub user_agent: String,
    /// IPOAlerts API 기본 URL
    pub ipo_alerts_url: String,
    /// IPOAlerts API 키 (환경 변수로 주입)
    #[serde(skip_serializing)]
    pub ipo_alerts_api_key: Option<String>,
    /// Chittorgarh 예정 IPO 페이지
    pub chittorgarh_url: String,
    /// Moneycontrol IPO 페이지
    pub moneycontrol_url: String,
    /// GMP RSS 피드 URL (없으면 보조 소스 비활성)
    pub gmp_feed_url: Option<String>,
    /// NSE 과거 시세 API 기본 URL
    pub nse_base_url: String,
    /// NSE 실패 시 Yahoo Finance 사용 여부
    pub enable_yahoo_fallback: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ipo_alerts_url: "https://api.ipoalerts.in/api/v1".to_string(),
            ipo_alerts_api_key: None,
            chittorgarh_url: "https://www.chittorgarh.com/ipo/upcoming-ipo/".to_string(),
            moneycontrol_url: "https://www.moneycontrol.com/ipo/".to_string(),
            gmp_feed_url: None,
            nse_base_url: "https://www.nseindia.com".to_string(),
            enable_yahoo_fallback: true,
        }
    }
}

impl SourcesConfig {
    /// 소스 타임아웃을 Duration으로 반환
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis URL (없으면 프로세스 내 메모리 캐시 사용)
    #[serde(skip_serializing)]
    pub redis_url: Option<String>,
    /// 데이터셋 TTL (초)
    pub ttl_secs: u64,
    /// 데이터셋 캐시 키
    pub dataset_key: String,
    /// 캐시 완전 비활성화
    pub disabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: 900,
            dataset_key: "ipos".to_string(),
            disabled: false,
        }
    }
}

/// 수익률 보강 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// 동시 시세 조회 수 상한
    pub max_concurrency: usize,
    /// 레코드별 시세 조회 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            timeout_secs: 15,
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL (없으면 메모리 저장소 사용)
    #[serde(skip_serializing)]
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            connect_timeout_secs: 30,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 데몬 모드 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// 데이터셋 갱신 주기 (분)
    pub interval_minutes: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 10,
        }
    }
}

impl DaemonConfig {
    /// 갱신 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드 (선택)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("IPO")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config.with_legacy_env())
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 접두사 없는 기존 환경 변수로 비어 있는 비밀 값을 채웁니다.
    fn with_legacy_env(mut self) -> Self {
        if self.sources.ipo_alerts_api_key.is_none() {
            self.sources.ipo_alerts_api_key = non_empty_env("IPO_ALERTS_API_KEY");
        }
        if self.cache.redis_url.is_none() {
            self.cache.redis_url = non_empty_env("REDIS_URL");
        }
        if self.database.url.is_none() {
            self.database.url = non_empty_env("DATABASE_URL");
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
