//! 과거 종가 시계열.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 일별 종가 한 점.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// 거래일
    pub date: NaiveDate,
    /// 종가
    pub close: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: Decimal) -> Self {
        Self { date, close }
    }
}
