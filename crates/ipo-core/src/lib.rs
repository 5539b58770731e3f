//! # IPO Core
//!
//! IPO 상장 정보 수집기의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 수집 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 데이터 소스 식별자 및 역할
//! - 원본 레코드와 정규화된(canonical) 레코드
//! - 상장 후 수익률 및 가격 시계열
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use logging::*;
