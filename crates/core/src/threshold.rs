//! Threshold evaluation
//!
//! Maps a numeric reading to a severity using a threshold type and an
//! ordered list of levels. Levels are checked in the order given and the
//! first one whose predicate holds wins; limits are never compared with
//! each other. A level whose limit is missing or has the wrong shape for
//! the threshold type simply never matches.

use vigil_types::{SensorStatus, ThresholdLevel, ThresholdLimit, ThresholdType};

/// Outcome of a threshold evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMatch {
    pub status: SensorStatus,
    /// Which rule matched and its limit(s); `None` when nothing matched
    pub message: Option<String>,
}

impl ThresholdMatch {
    fn ok() -> Self {
        Self {
            status: SensorStatus::Ok,
            message: None,
        }
    }
}

/// Evaluate `value` against `levels` using the predicate of `threshold_type`
pub fn match_threshold(
    value: f64,
    threshold_type: ThresholdType,
    levels: &[ThresholdLevel],
) -> ThresholdMatch {
    levels
        .iter()
        .find_map(|level| {
            match_level(value, threshold_type, &level.limit).map(|message| ThresholdMatch {
                status: level.status,
                message: Some(message),
            })
        })
        .unwrap_or_else(ThresholdMatch::ok)
}

fn match_level(
    value: f64,
    threshold_type: ThresholdType,
    limit: &ThresholdLimit,
) -> Option<String> {
    match (threshold_type, limit) {
        (ThresholdType::Exceeds, ThresholdLimit::Value(Some(limit))) if value > *limit => {
            Some(format!("exceeds {}", limit))
        }
        (ThresholdType::Falls, ThresholdLimit::Value(Some(limit))) if value < *limit => {
            Some(format!("falls below {}", limit))
        }
        (ThresholdType::InnerInterval, ThresholdLimit::Interval(Some(low), Some(high)))
            if *low < value && value < *high =>
        {
            Some(format!("violating the interval {} - {}", low, high))
        }
        (ThresholdType::OuterInterval, ThresholdLimit::Interval(Some(low), Some(high)))
            if value < *low || value > *high =>
        {
            Some(format!("outside the allowed interval {} - {}", low, high))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::ThresholdConfig;

    fn exceeds() -> ThresholdConfig {
        ThresholdConfig::new(ThresholdType::Exceeds)
            .with_limit(SensorStatus::Critical, 10.0)
            .with_limit(SensorStatus::Warning, 5.0)
    }

    fn check(config: &ThresholdConfig, value: f64) -> ThresholdMatch {
        match_threshold(value, config.threshold_type, &config.levels)
    }

    #[test]
    fn test_exceeds() {
        let config = exceeds();

        let critical = check(&config, 14.0);
        assert_eq!(critical.status, SensorStatus::Critical);
        assert_eq!(critical.message.as_deref(), Some("exceeds 10"));

        let warning = check(&config, 6.0);
        assert_eq!(warning.status, SensorStatus::Warning);
        assert_eq!(warning.message.as_deref(), Some("exceeds 5"));

        assert_eq!(check(&config, 4.0), ThresholdMatch::ok());
        // Limits are exclusive
        assert_eq!(check(&config, 5.0), ThresholdMatch::ok());
    }

    #[test]
    fn test_falls() {
        let config = ThresholdConfig::new(ThresholdType::Falls)
            .with_limit(SensorStatus::Critical, 5.0)
            .with_limit(SensorStatus::Warning, 10.0);

        let critical = check(&config, 3.0);
        assert_eq!(critical.status, SensorStatus::Critical);
        assert_eq!(critical.message.as_deref(), Some("falls below 5"));
        assert_eq!(check(&config, 7.5).status, SensorStatus::Warning);
        assert_eq!(check(&config, 12.0), ThresholdMatch::ok());
    }

    #[test]
    fn test_inner_interval() {
        let config = ThresholdConfig::new(ThresholdType::InnerInterval)
            .with_interval(SensorStatus::Critical, 4.0, 6.0)
            .with_interval(SensorStatus::Warning, 1.0, 9.0);

        let critical = check(&config, 5.0);
        assert_eq!(critical.status, SensorStatus::Critical);
        assert_eq!(critical.message.as_deref(), Some("violating the interval 4 - 6"));
        assert_eq!(check(&config, 7.0).status, SensorStatus::Warning);
        assert_eq!(check(&config, 11.0), ThresholdMatch::ok());
        assert_eq!(check(&config, 0.0), ThresholdMatch::ok());
    }

    #[test]
    fn test_outer_interval() {
        let config = ThresholdConfig::new(ThresholdType::OuterInterval)
            .with_interval(SensorStatus::Critical, 60.0, 90.0)
            .with_interval(SensorStatus::Warning, 70.0, 80.0);

        let critical = check(&config, 130.0);
        assert_eq!(critical.status, SensorStatus::Critical);
        assert_eq!(
            critical.message.as_deref(),
            Some("outside the allowed interval 60 - 90")
        );
        assert_eq!(check(&config, 69.0).status, SensorStatus::Warning);
        assert_eq!(check(&config, 75.0), ThresholdMatch::ok());
    }

    #[test]
    fn test_iteration_order_is_authoritative() {
        // Warning listed first wins even though critical would also match
        let config = ThresholdConfig::new(ThresholdType::Exceeds)
            .with_limit(SensorStatus::Warning, 5.0)
            .with_limit(SensorStatus::Critical, 10.0);
        assert_eq!(check(&config, 14.0).status, SensorStatus::Warning);
    }

    #[test]
    fn test_malformed_levels_never_match() {
        let config = ThresholdConfig::new(ThresholdType::InnerInterval)
            .with_level(SensorStatus::Critical, ThresholdLimit::Interval(Some(4.0), None))
            .with_level(SensorStatus::Warning, ThresholdLimit::Value(Some(1.0)))
            .with_level(SensorStatus::Info, ThresholdLimit::Interval(Some(0.0), Some(100.0)));
        assert_eq!(check(&config, 5.0).status, SensorStatus::Info);

        let nulls = ThresholdConfig::new(ThresholdType::Exceeds)
            .with_level(SensorStatus::Critical, ThresholdLimit::Value(None))
            .with_level(SensorStatus::Warning, ThresholdLimit::Interval(Some(1.0), Some(2.0)));
        assert_eq!(check(&nulls, 1000.0), ThresholdMatch::ok());
    }

    #[test]
    fn test_values_within_limits_are_ok_for_every_type() {
        let cases = [
            (ThresholdType::Exceeds, ThresholdLimit::Value(Some(100.0)), 50.0),
            (ThresholdType::Falls, ThresholdLimit::Value(Some(10.0)), 50.0),
            (ThresholdType::InnerInterval, ThresholdLimit::Interval(Some(60.0), Some(90.0)), 50.0),
            (ThresholdType::OuterInterval, ThresholdLimit::Interval(Some(10.0), Some(90.0)), 50.0),
        ];
        for (threshold_type, limit, value) in cases {
            let levels = vec![ThresholdLevel {
                status: SensorStatus::Critical,
                limit,
            }];
            assert_eq!(
                match_threshold(value, threshold_type, &levels),
                ThresholdMatch::ok(),
                "{} should not match {}",
                threshold_type,
                value
            );
        }
    }

    #[test]
    fn test_nan_never_matches() {
        assert_eq!(check(&exceeds(), f64::NAN), ThresholdMatch::ok());
    }
}
