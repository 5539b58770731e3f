//! 데이터 소스 식별자.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 데이터 소스 식별자 (예: "ipo_alerts", "chittorgarh").
///
/// 정렬 가능하므로 canonical 레코드의 `sources` 집합 순서가 결정적입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 소스 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    /// 상장 목록 자체를 제공하는 소스 (병합 identity 기준)
    Primary,
    /// GMP 등 보조 신호만 제공하는 소스
    Auxiliary,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Auxiliary => write!(f, "auxiliary"),
        }
    }
}
