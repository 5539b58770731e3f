//! 도메인 모델.
//!
//! - `source`: 데이터 소스 식별자와 역할
//! - `listing`: 원본/정규화 IPO 레코드, 상태 버킷
//! - `price`: 과거 종가 시계열

pub mod listing;
pub mod price;
pub mod source;

pub use listing::*;
pub use price::*;
pub use source::*;
