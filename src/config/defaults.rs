//! Sensors configured out of the box
//!
//! Written by `vigil init` and used when no config file exists.

use vigil_types::{SensorDefinition, SensorStatus, ThresholdConfig, ThresholdType};

pub fn default_sensors() -> Vec<SensorDefinition> {
    vec![
        SensorDefinition::new("memory", "memory_usage")
            .with_label("Memory usage")
            .with_category("System")
            .with_caching_time(60)
            .with_thresholds(percent_thresholds(80.0, 95.0)),
        SensorDefinition::new("swap", "swap_usage")
            .with_label("Swap usage")
            .with_category("System")
            .with_caching_time(60)
            .with_thresholds(percent_thresholds(50.0, 90.0)),
        SensorDefinition::new("cpu", "cpu_usage")
            .with_label("CPU usage")
            .with_category("System")
            .with_thresholds(percent_thresholds(85.0, 98.0)),
        SensorDefinition::new("load", "load_average")
            .with_label("Load average per CPU")
            .with_category("System")
            .with_setting("per_cpu", true)
            .with_thresholds(
                ThresholdConfig::new(ThresholdType::Exceeds)
                    .with_limit(SensorStatus::Critical, 4.0)
                    .with_limit(SensorStatus::Warning, 2.0),
            ),
        SensorDefinition::new("disk_root", "disk_usage")
            .with_label("Disk usage of /")
            .with_category("Storage")
            .with_caching_time(300)
            .with_setting("mount_point", "/")
            .with_thresholds(percent_thresholds(85.0, 95.0)),
    ]
}

fn percent_thresholds(warning: f64, critical: f64) -> ThresholdConfig {
    ThresholdConfig::new(ThresholdType::Exceeds)
        .with_limit(SensorStatus::Critical, critical)
        .with_limit(SensorStatus::Warning, warning)
}
