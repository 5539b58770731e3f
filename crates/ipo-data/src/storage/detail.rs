//! 회사 상세 정보 저장소.
//!
//! canonical 이름을 키로 하는 upsert 저장소입니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipo_core::{CompanyDetail, DatabaseConfig};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{DataError, Result};

/// 상세 정보 저장소 trait.
#[async_trait]
pub trait DetailStore: Send + Sync {
    /// 이름으로 상세 정보 조회.
    async fn get(&self, name: &str) -> Result<Option<CompanyDetail>>;

    /// 상세 정보 저장 (있으면 교체).
    async fn put(&self, name: &str, about: &str, financials: &str) -> Result<CompanyDetail>;
}

/// `ipo_details` 테이블 행.
#[derive(Debug, Clone, FromRow)]
struct DetailRecord {
    name: String,
    about: String,
    financials: String,
    updated_at: DateTime<Utc>,
}

impl From<DetailRecord> for CompanyDetail {
    fn from(record: DetailRecord) -> Self {
        Self {
            name: record.name,
            about: record.about,
            financials: record.financials,
            updated_at: record.updated_at,
        }
    }
}

/// PostgreSQL 상세 정보 저장소.
#[derive(Clone)]
pub struct PgDetailStore {
    pool: PgPool,
}

impl PgDetailStore {
    /// 새로운 연결 풀을 생성합니다.
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        info!("데이터베이스 연결 중...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("데이터베이스 연결 완료");
        Ok(Self { pool })
    }

    /// 기존 연결 풀 재사용.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 테이블이 없으면 생성합니다.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ipo_details (
                name TEXT PRIMARY KEY,
                about TEXT NOT NULL DEFAULT '',
                financials TEXT NOT NULL DEFAULT '',
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("ipo_details 스키마 확인 완료");
        Ok(())
    }

    /// 연결 풀 종료.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DetailStore for PgDetailStore {
    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<Option<CompanyDetail>> {
        let record: Option<DetailRecord> = sqlx::query_as(
            "SELECT name, about, financials, updated_at FROM ipo_details WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(CompanyDetail::from))
    }

    #[instrument(skip(self, about, financials))]
    async fn put(&self, name: &str, about: &str, financials: &str) -> Result<CompanyDetail> {
        let record: DetailRecord = sqlx::query_as(
            r#"
            INSERT INTO ipo_details (name, about, financials, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (name) DO UPDATE SET
                about = EXCLUDED.about,
                financials = EXCLUDED.financials,
                updated_at = EXCLUDED.updated_at
            RETURNING name, about, financials, updated_at
            "#,
        )
        .bind(name)
        .bind(about)
        .bind(financials)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }
}

/// 메모리 상세 정보 저장소.
#[derive(Default)]
pub struct MemoryDetailStore {
    details: RwLock<HashMap<String, CompanyDetail>>,
}

impl MemoryDetailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DetailStore for MemoryDetailStore {
    async fn get(&self, name: &str) -> Result<Option<CompanyDetail>> {
        Ok(self.details.read().await.get(name).cloned())
    }

    async fn put(&self, name: &str, about: &str, financials: &str) -> Result<CompanyDetail> {
        let detail = CompanyDetail {
            name: name.to_string(),
            about: about.to_string(),
            financials: financials.to_string(),
            updated_at: Utc::now(),
        };
        self.details
            .write()
            .await
            .insert(name.to_string(), detail.clone());
        Ok(detail)
    }
}
