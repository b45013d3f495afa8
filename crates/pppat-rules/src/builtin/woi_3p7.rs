//! WOI 3.7: plasma current.

use pppat_model::{get_waveform, CheckResult};
use tracing::info;

use crate::rule::{RuleContext, RuleError};

pub const CHECK_NAME: &str = "WOI 3.7: plasma current";

/// Plasma current reference waveform.
pub const IP_WAVEFORM: &str = "rts:WEST_PCS/Plasma/Ip/waveform.ref";

/// Maximum plasma current, in A.
pub const IP_MAX: f64 = 1e6;

/// Check the programmed plasma current against the machine limit.
pub fn check_plasma_current(ctx: &RuleContext) -> Result<CheckResult, RuleError> {
    let waveform = get_waveform(IP_WAVEFORM, ctx.waveforms())
        .ok_or_else(|| RuleError::MissingWaveform(IP_WAVEFORM.to_string()))?;

    let ip_max = waveform
        .max_value()
        .ok_or_else(|| RuleError::Failed(format!("waveform {IP_WAVEFORM} has no samples")))?;
    info!(ip_max, "Max Ip from waveform");

    // TODO: report the time and segment of the first sample above the limit.
    if ip_max > IP_MAX {
        Ok(CheckResult::error(
            CHECK_NAME,
            "Plasma current above maximum limit",
        ))
    } else {
        Ok(CheckResult::ok(CHECK_NAME, "Plasma current OK"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pppat_model::{ResultCode, Waveform, WaveformStore};

    use super::*;

    fn ctx_with_peak(peak: f64) -> RuleContext {
        let ip = Waveform::from_samples(IP_WAVEFORM, [(0.0, 0.0), (5.0, peak), (10.0, 0.0)]).unwrap();
        RuleContext::new(true, Arc::new(WaveformStore::new().with_waveform(ip)))
    }

    #[test]
    fn test_below_limit_is_ok() {
        let result = check_plasma_current(&ctx_with_peak(9.5e5)).unwrap();
        assert_eq!(result.code, ResultCode::Ok);
        assert_eq!(result.name, CHECK_NAME);
    }

    #[test]
    fn test_at_limit_is_ok() {
        let result = check_plasma_current(&ctx_with_peak(IP_MAX)).unwrap();
        assert_eq!(result.code, ResultCode::Ok);
    }

    #[test]
    fn test_above_limit_is_error() {
        let result = check_plasma_current(&ctx_with_peak(1.2e6)).unwrap();
        assert_eq!(result.code, ResultCode::Error);
        assert_eq!(result.text, "Plasma current above maximum limit");
    }

    #[test]
    fn test_missing_waveform_fails() {
        let ctx = RuleContext::new(false, Arc::new(WaveformStore::new()));
        let err = check_plasma_current(&ctx).unwrap_err();
        assert_eq!(
            err.to_string(),
            "waveform rts:WEST_PCS/Plasma/Ip/waveform.ref not found!?"
        );
    }
}
