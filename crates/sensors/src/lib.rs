//! vigil-sensors: Built-in sensor implementations for vigil.

mod command;
mod cpu;
mod disk;
mod file_age;
mod memory;
mod static_value;
mod system;

pub use command::{CommandConfig, CommandSensor};
pub use cpu::{CpuUsageSensor, LoadAverageConfig, LoadAverageSensor, LoadWindow};
pub use disk::{DiskUsageConfig, DiskUsageSensor};
pub use file_age::{FileAgeConfig, FileAgeSensor};
pub use memory::{MemoryUsageSensor, SwapUsageSensor};
pub use static_value::{StaticValueConfig, StaticValueSensor};

use vigil_core::Registry;

/// Initialize the shared sysinfo handle (call once at startup)
pub fn initialize_sensors() {
    system::initialize();
}

/// Register all built-in sensor types
pub fn register_all(registry: &mut Registry) {
    registry.register_sensor_type_with_info(
        "memory_usage",
        "Memory usage",
        "Percentage of physical memory in use",
        MemoryUsageSensor::create,
    );
    registry.register_sensor_type_with_info(
        "swap_usage",
        "Swap usage",
        "Percentage of swap space in use",
        SwapUsageSensor::create,
    );
    registry.register_sensor_type_with_info(
        "disk_usage",
        "Disk usage",
        "Percentage of space used on a mounted filesystem (setting: mount_point)",
        DiskUsageSensor::create,
    );
    registry.register_sensor_type_with_info(
        "cpu_usage",
        "CPU usage",
        "Global CPU usage in percent",
        CpuUsageSensor::create,
    );
    registry.register_sensor_type_with_info(
        "load_average",
        "Load average",
        "System load average (settings: window, per_cpu)",
        LoadAverageSensor::create,
    );
    registry.register_sensor_type_with_info(
        "file_age",
        "File age",
        "Seconds since a file was last modified (setting: path)",
        FileAgeSensor::create,
    );
    registry.register_sensor_type_with_info(
        "command",
        "Command",
        "Exit code of a shell command (settings: command, expected_exit_code)",
        CommandSensor::create,
    );
    registry.register_sensor_type_with_info(
        "static_value",
        "Static value",
        "Reports configured values (settings: value, expected_value, status, message)",
        StaticValueSensor::create,
    );

    log::debug!("Registered {} built-in sensor types", registry.list_sensor_types().len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::SensorDefinition;

    #[test]
    fn test_register_all() {
        let mut registry = Registry::new();
        register_all(&mut registry);

        let ids: Vec<_> = registry.list_sensor_types().into_iter().map(|info| info.id).collect();
        assert_eq!(
            ids,
            vec![
                "command",
                "cpu_usage",
                "disk_usage",
                "file_age",
                "load_average",
                "memory_usage",
                "static_value",
                "swap_usage",
            ]
        );
        assert!(registry
            .create_sensor(&SensorDefinition::new("root", "disk_usage"))
            .is_ok());
    }
}
