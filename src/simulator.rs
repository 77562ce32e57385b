use log::{debug, info};

use crate::error::{Error, Result};

/// Runs an external simulator and returns what it printed on stdout.
///
/// `command` is the program followed by its arguments. A non-zero exit
/// status or output that is not UTF-8 is reported as `SimulatorFailed`.
pub fn run(command: &[String]) -> Result<String> {
    let _p = hprof::enter("run simulator");
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::SimulatorFailed("empty command".to_string()))?;

    info!("Running simulator {}", command.join(" "));
    let output = duct::cmd(program, args)
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|e| Error::SimulatorFailed(format!("{}: {}", program, e)))?;

    if !output.status.success() {
        return Err(Error::SimulatorFailed(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    debug!("Simulator wrote {} bytes", output.stdout.len());
    String::from_utf8(output.stdout)
        .map_err(|_| Error::SimulatorFailed(format!("{} wrote non-UTF-8 output", program)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    pub fn empty_command_fails() {
        assert!(matches!(run(&[]), Err(Error::SimulatorFailed(_))));
    }

    #[test]
    pub fn missing_program_fails() {
        assert!(matches!(
            run(&cmd(&["./no-such-simulator-here"])),
            Err(Error::SimulatorFailed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    pub fn captures_stdout() {
        let out = run(&cmd(&["echo", "{}"])).unwrap();
        assert_eq!(out.trim(), "{}");
        assert!(matches!(run(&cmd(&["false"])), Err(Error::SimulatorFailed(_))));
    }
}
