//! Conversions between base units and the packet/plate representation
//! used for display and restocking.

use crate::error::{AppError, AppResult};

/// `N` packs (or plates) plus `M` loose units expressed in base units.
pub fn to_base_units(packs: i32, loose: i32, factor: i32) -> AppResult<i32> {
    if factor <= 0 {
        return Err(AppError::InvalidOrderData(
            "conversion factor must be positive".into(),
        ));
    }
    if packs < 0 || loose < 0 {
        return Err(AppError::InvalidOrderData(
            "pack and unit counts must not be negative".into(),
        ));
    }
    packs
        .checked_mul(factor)
        .and_then(|base| base.checked_add(loose))
        .ok_or_else(|| AppError::InvalidOrderData("quantity overflow".into()))
}

/// Splits a base-unit total into `(packs, leftover_units)`.
pub fn split_base_units(total: i32, factor: i32) -> AppResult<(i32, i32)> {
    if factor <= 0 {
        return Err(AppError::InvalidOrderData(
            "conversion factor must be positive".into(),
        ));
    }
    if total < 0 {
        return Err(AppError::InvalidOrderData(
            "stock total must not be negative".into(),
        ));
    }
    Ok((total / factor, total % factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cigarette_packets_to_base_units() {
        // 3 packets of 20 plus 5 loose cigarettes.
        assert_eq!(to_base_units(3, 5, 20).unwrap(), 65);
        assert_eq!(split_base_units(65, 20).unwrap(), (3, 5));
    }

    #[test]
    fn round_trip_is_lossless() {
        for factor in [1, 6, 20, 30] {
            for total in 0..500 {
                let (packs, loose) = split_base_units(total, factor).unwrap();
                assert!(loose < factor);
                assert_eq!(to_base_units(packs, loose, factor).unwrap(), total);
            }
        }
    }

    #[test]
    fn exact_multiples_leave_no_loose_units() {
        assert_eq!(split_base_units(60, 20).unwrap(), (3, 0));
        assert_eq!(split_base_units(0, 20).unwrap(), (0, 0));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(to_base_units(1, 0, 0).is_err());
        assert!(to_base_units(-1, 0, 20).is_err());
        assert!(split_base_units(-1, 20).is_err());
        assert!(split_base_units(10, 0).is_err());
    }
}
