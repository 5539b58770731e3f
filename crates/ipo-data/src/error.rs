//! 데이터 모듈 오류 타입.
//!
//! - `SourceError`: 어댑터 경계에서 잡히는 소스 실패. 해당 실행에서 소스만 제외됩니다.
//! - `DataError`: 캐시/저장소/시세 조회 오류. 호출 측에서 잡아 degrade 합니다.
//! - `PipelineError`: Reconciler/Classifier 불변식 위반. 유일하게 호출자에게 전파됩니다.

use std::time::Duration;
use thiserror::Error;

/// 소스 어댑터 오류.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// 네트워크/전송 오류
    #[error("HTTP 요청 실패: {0}")]
    Network(String),

    /// 비정상 HTTP 상태 코드
    #[error("HTTP {status} 응답")]
    HttpStatus { status: u16 },

    /// Rate limit 초과
    #[error("Rate limit 초과")]
    RateLimited,

    /// 요청 타임아웃
    #[error("타임아웃 ({}ms)", .0.as_millis())]
    Timeout(Duration),

    /// 응답 파싱 실패
    #[error("응답 파싱 실패: {0}")]
    Parse(String),

    /// 설정 누락 (API 키 등)
    #[error("설정 오류: {0}")]
    Config(String),
}

impl SourceError {
    /// 로그/통계용 오류 분류.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::RateLimited => "rate_limited",
            Self::Timeout(_) => "timeout",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
        }
    }

    /// HTTP 상태 코드를 오류로 변환합니다. 성공 코드면 `None`.
    pub fn from_status(status: reqwest::StatusCode) -> Option<Self> {
        if status.is_success() {
            None
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Some(Self::RateLimited)
        } else {
            Some(Self::HttpStatus {
                status: status.as_u16(),
            })
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest는 설정된 타임아웃 값을 노출하지 않음
            Self::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// 캐시, 저장소, 시세 조회 오류.
///
/// 레코드 단위 또는 게이트웨이 경계에서 잡히며 파이프라인을 중단시키지 않습니다.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("DB 연결 실패: {0}")]
    ConnectionError(String),

    #[error("쿼리 실패: {0}")]
    QueryError(String),

    #[error("레코드 없음: {0}")]
    NotFound(String),

    /// 캐시 payload 등 JSON 변환 실패
    #[error("직렬화 실패: {0}")]
    SerializationError(String),

    #[error("캐시 백엔드 오류: {0}")]
    CacheError(String),

    #[error("잘못된 데이터: {0}")]
    InvalidData(String),

    #[error("DB 연결 풀 소진")]
    PoolExhausted,

    #[error("시간 초과: {0}")]
    Timeout(String),

    /// 외부 시세 소스 호출 실패
    #[error("조회 실패: {0}")]
    FetchError(String),

    #[error("파싱 실패: {0}")]
    ParseError(String),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("ipo_details".to_string()),
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            sqlx::Error::Io(e) => Self::ConnectionError(e.to_string()),
            sqlx::Error::Database(db_err) => Self::QueryError(db_err.message().to_string()),
            other => Self::QueryError(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for DataError {
    fn from(err: redis::RedisError) -> Self {
        Self::CacheError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<SourceError> for DataError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Timeout(_) => DataError::Timeout(err.to_string()),
            SourceError::Parse(msg) => DataError::ParseError(msg),
            other => DataError::FetchError(other.to_string()),
        }
    }
}

/// `ipo-data` 공용 Result.
pub type Result<T> = std::result::Result<T, DataError>;

/// 파이프라인 내부 오류.
///
/// 데이터 부재가 아니라 Reconciler/Classifier의 불변식 위반을 뜻합니다.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("파이프라인 내부 오류: {0}")]
    Internal(String),
}
