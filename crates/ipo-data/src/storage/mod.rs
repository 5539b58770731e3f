//! 영구 저장소.
//!
//! 캐시와 달리 TTL 없이 보관하는 회사 상세 정보(소개, 재무 요약)를 다룹니다.

pub mod detail;

pub use detail::{DetailStore, MemoryDetailStore, PgDetailStore};
