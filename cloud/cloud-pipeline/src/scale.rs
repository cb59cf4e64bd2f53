//! Source-to-target scale resolution.

use crate::{PipelineError, PipelineResult, RegistrationConfig};

/// Resolves the scale ratio of a configuration.
///
/// See [`resolve_scale`] for the rules.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidScaleConfig`] as described there.
pub fn estimate_scale(config: &RegistrationConfig) -> PipelineResult<f64> {
    resolve_scale(
        config.scale_ratio,
        config.source_measurement,
        config.target_measurement,
    )
}

/// Resolves a scale ratio from an explicit value and two measurements.
///
/// - an explicit ratio other than 1.0 is used directly;
/// - otherwise two positive measurements give `target / source`;
/// - otherwise the scale is 1.0.
///
/// The measurements are checked even when the explicit ratio wins.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidScaleConfig`] if the explicit ratio is not
/// a positive finite number, if exactly one measurement is positive, if a
/// measurement is not finite, or if the derived ratio overflows.
///
/// # Example
///
/// ```
/// use cloud_pipeline::resolve_scale;
///
/// assert_eq!(resolve_scale(1.0, 2.0, 6.0).unwrap(), 3.0);
/// assert_eq!(resolve_scale(0.5, 2.0, 6.0).unwrap(), 0.5);
/// assert!(resolve_scale(1.0, 0.0, 5.0).is_err());
/// ```
pub fn resolve_scale(ratio: f64, source: f64, target: f64) -> PipelineResult<f64> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(PipelineError::invalid_scale(format!(
            "scale ratio must be positive and finite, got {ratio}"
        )));
    }
    if !source.is_finite() || !target.is_finite() {
        return Err(PipelineError::invalid_scale(format!(
            "measurements must be finite, got source {source} and target {target}"
        )));
    }
    if (source > 0.0) != (target > 0.0) {
        return Err(PipelineError::invalid_scale(format!(
            "measurements must both be positive, got source {source} and target {target}"
        )));
    }

    #[allow(clippy::float_cmp)]
    let explicit = ratio != 1.0;
    if explicit {
        return Ok(ratio);
    }
    if source > 0.0 {
        let derived = target / source;
        if !derived.is_finite() || derived <= 0.0 {
            return Err(PipelineError::invalid_scale(format!(
                "measurement ratio {target} / {source} is not usable"
            )));
        }
        return Ok(derived);
    }
    Ok(1.0)
}
