//! Rules compiled into the crate.

pub mod woi_3p7;

use crate::rule::{FnRule, RuleUnit};

/// Every built-in unit, ready for [`StaticRegistry`](crate::registry::StaticRegistry).
pub fn units() -> Vec<RuleUnit> {
    vec![RuleUnit::new("WOI_3p7").with_function(FnRule::new(
        "check_WOI_3p7_plasma_current",
        woi_3p7::check_plasma_current,
    ))]
}
