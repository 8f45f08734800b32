//! 數量精度處理
//!
//! 所有持久化的數量皆為兩位小數。

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{MfgError, Result};

/// 儲存精度（小數位數）
pub const SCALE: u32 = 2;

/// 四捨五入到儲存精度
pub fn round(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// 正規化並要求數量大於 0
pub fn positive(quantity: Decimal, field: &str) -> Result<Decimal> {
    let rounded = round(quantity);
    if rounded <= Decimal::ZERO {
        return Err(MfgError::validation(format!(
            "{} 必須大於 0（收到 {}）",
            field, quantity
        )));
    }
    Ok(rounded)
}

/// 正規化並要求數量不小於 0
pub fn non_negative(quantity: Decimal, field: &str) -> Result<Decimal> {
    let rounded = round(quantity);
    if rounded < Decimal::ZERO {
        return Err(MfgError::validation(format!(
            "{} 不可為負數（收到 {}）",
            field, quantity
        )));
    }
    Ok(rounded)
}

/// 相加，超出可表示範圍時回傳驗證錯誤
pub fn checked_add(left: Decimal, right: Decimal) -> Result<Decimal> {
    left.checked_add(right)
        .ok_or_else(|| overflow(left, "+", right))
}

/// 相乘，超出可表示範圍時回傳驗證錯誤
pub fn checked_mul(left: Decimal, right: Decimal) -> Result<Decimal> {
    left.checked_mul(right)
        .ok_or_else(|| overflow(left, "×", right))
}

fn overflow(left: Decimal, op: &str, right: Decimal) -> MfgError {
    MfgError::validation(format!("數量超出可表示範圍：{} {} {}", left, op, right))
}

/// 缺料量 = max(0, 需求 - 可用)
pub fn shortage(required: Decimal, available: Decimal) -> Decimal {
    (required - available).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_midpoint_away_from_zero() {
        assert_eq!(round(dec!(1.005)), dec!(1.01));
        assert_eq!(round(dec!(1.004)), dec!(1.00));
        assert_eq!(round(dec!(11.0000)), dec!(11.00));
    }

    #[test]
    fn test_positive_rejects_zero_after_rounding() {
        assert!(positive(dec!(0.004), "quantity").is_err());
        assert!(positive(dec!(-1), "quantity").is_err());
        assert_eq!(positive(dec!(2.5), "quantity").unwrap(), dec!(2.50));
    }

    #[test]
    fn test_non_negative_allows_zero() {
        assert_eq!(non_negative(Decimal::ZERO, "qty").unwrap(), Decimal::ZERO);
        assert!(non_negative(dec!(-0.01), "qty").is_err());
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        assert_eq!(checked_add(dec!(1.5), dec!(2)).unwrap(), dec!(3.5));
        assert_eq!(checked_mul(dec!(1.5), dec!(2)).unwrap(), dec!(3.0));
        assert!(matches!(
            checked_add(Decimal::MAX, Decimal::ONE),
            Err(MfgError::Validation(_))
        ));
        assert!(matches!(
            checked_mul(Decimal::MAX, dec!(2)),
            Err(MfgError::Validation(_))
        ));
    }

    #[test]
    fn test_shortage() {
        assert_eq!(shortage(dec!(30), dec!(25)), dec!(5));
        assert_eq!(shortage(dec!(30), dec!(40)), Decimal::ZERO);
    }
}
