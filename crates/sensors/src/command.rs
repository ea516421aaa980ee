//! Shell command sensor
//!
//! Runs a command through `sh -c` and compares its exit code with the
//! expected one. Captured output is kept for verbose reporting. When the
//! evaluation has a deadline, a command still running at that point is
//! killed together with everything it started.

use crate::system;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use vigil_core::{BoxedSensor, ExtendedInfo, Sensor, SensorResult};
use vigil_types::SensorDefinition;

/// Verbose output is cut after this many bytes
const MAX_CAPTURED_OUTPUT: usize = 4096;

/// How often a running command is checked for completion
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandConfig {
    pub command: String,
    #[serde(default)]
    pub expected_exit_code: i32,
}

pub struct CommandSensor {
    config: CommandConfig,
    last_output: Mutex<String>,
}

impl CommandSensor {
    pub fn create(definition: &SensorDefinition) -> Result<BoxedSensor> {
        let config: CommandConfig = definition
            .settings_as()
            .context("command sensors need a 'command' setting")?;
        if config.command.trim().is_empty() {
            bail!("command must not be empty");
        }
        Ok(Box::new(Self {
            config,
            last_output: Mutex::new(String::new()),
        }))
    }

    fn set_output(&self, output: String) {
        *self
            .last_output
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = output;
    }

    /// Wait for `child`, killing it once `deadline` passes
    fn wait(&self, child: &mut Child, deadline: Option<Instant>) -> Result<ExitStatus> {
        let Some(deadline) = deadline else {
            return Ok(child.wait()?);
        };
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let killed = system::kill_process_tree(child.id());
                // Already gone or reaped elsewhere; wait() below settles it
                let _ = child.kill();
                let _ = child.wait();
                log::warn!(
                    "Killed '{}' at its deadline ({} processes)",
                    self.config.command,
                    killed
                );
                bail!("'{}' did not finish in time and was killed", self.config.command);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Sensor for CommandSensor {
    fn run_sensor(&self, _definition: &SensorDefinition, result: &mut SensorResult) -> Result<()> {
        self.set_output(String::new());
        log::debug!("Running command: {}", self.config.command);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.config.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.config.command))?;

        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());
        let status = self.wait(&mut child, result.deadline())?;

        let mut captured = collect(stdout);
        captured.push_str(&collect(stderr));
        truncate(&mut captured, MAX_CAPTURED_OUTPUT);
        self.set_output(captured);

        let Some(code) = status.code() else {
            bail!("'{}' was terminated by a signal", self.config.command);
        };
        result.set_value(code);
        result.set_expected_value(self.config.expected_exit_code);
        Ok(())
    }

    fn extended_info(&self) -> Option<&dyn ExtendedInfo> {
        Some(self)
    }
}

impl ExtendedInfo for CommandSensor {
    fn result_verbose(&self, _result: &SensorResult) -> String {
        let output = self
            .last_output
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        format!("$ {}\n{}", self.config.command, output.trim_end())
    }
}

/// Drain a pipe on its own thread so a chatty command cannot block on it
fn capture<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    let mut pipe = pipe?;
    thread::Builder::new()
        .name("command-output".to_string())
        .spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
        .ok()
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn truncate(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn command(cmd: &str, expected: i32) -> SensorDefinition {
        SensorDefinition::new("job", "command")
            .with_setting("command", cmd)
            .with_setting("expected_exit_code", expected)
    }

    fn run(definition: &SensorDefinition) -> (BoxedSensor, SensorResult) {
        let sensor = CommandSensor::create(definition).unwrap();
        let mut result = SensorResult::new("job", Utc::now());
        sensor.run_sensor(definition, &mut result).unwrap();
        result.compile(definition);
        (sensor, result)
    }

    #[test]
    fn test_expected_exit_code_is_ok() {
        let (sensor, result) = run(&command("echo hello", 0));
        assert!(result.is_ok());
        assert_eq!(result.message(), "Value 0, expected 0");

        let verbose = sensor.extended_info().unwrap().result_verbose(&result);
        assert_eq!(verbose, "$ echo hello\nhello");
    }

    #[test]
    fn test_unexpected_exit_code_is_critical() {
        let (_, result) = run(&command("exit 3", 0));
        assert!(result.is_critical());
        assert_eq!(result.message(), "Value 3, expected 0");

        let (_, result) = run(&command("exit 3", 3));
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(CommandSensor::create(&command("  ", 0)).is_err());
        assert!(CommandSensor::create(&SensorDefinition::new("job", "command")).is_err());
    }

    #[test]
    fn test_finishes_before_deadline() {
        let definition = command("echo quick", 0);
        let sensor = CommandSensor::create(&definition).unwrap();
        let mut result = SensorResult::new("job", Utc::now());
        result.set_deadline(Instant::now() + Duration::from_secs(10));

        sensor.run_sensor(&definition, &mut result).unwrap();
        assert_eq!(result.value().unwrap().to_number(), 0.0);
    }

    /// Whether `pid` still runs; zombies count as gone
    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit_once(") ")
                .map_or(false, |(_, rest)| !rest.starts_with('Z')),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_deadline_kills_command_and_its_children() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("second-run");
        let pid_file = dir.path().join("sleeper.pid");
        // First run prints and exits, later runs hang on a background sleep
        let script = format!(
            "if [ -e {flag} ]; then sleep 30 & echo $! > {pid}; wait; \
             else touch {flag}; echo first; fi",
            flag = flag.display(),
            pid = pid_file.display()
        );
        let definition = command(&script, 0);
        let sensor = CommandSensor::create(&definition).unwrap();

        let mut earlier = SensorResult::new("job", Utc::now());
        sensor.run_sensor(&definition, &mut earlier).unwrap();
        let verbose = sensor.extended_info().unwrap().result_verbose(&earlier);
        assert!(verbose.ends_with("first"));

        let started = Instant::now();
        let mut result = SensorResult::new("job", Utc::now());
        result.set_deadline(Instant::now() + Duration::from_millis(300));
        let err = sensor.run_sensor(&definition, &mut result).unwrap_err();

        assert!(err.to_string().contains("did not finish in time"));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(result.value().is_none());

        let pid: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let gone_by = Instant::now() + Duration::from_secs(2);
        while is_running(pid) && Instant::now() < gone_by {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(!is_running(pid), "background sleep {} survived", pid);

        // Output of the earlier run must not show up for this one
        let verbose = sensor.extended_info().unwrap().result_verbose(&result);
        assert_eq!(verbose, format!("$ {}\n", script));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let mut text = "ab\u{e9}cd".to_string();
        truncate(&mut text, 3);
        assert_eq!(text, "ab");
    }
}
