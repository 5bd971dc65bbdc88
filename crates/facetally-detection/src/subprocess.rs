//! Detector backed by a long-lived child process.
//!
//! The child reads one image path per line on stdin and answers each with a
//! single line holding the face count. It is spawned once at startup and kept
//! for the lifetime of the process; closing its stdin asks it to exit.

use crate::detector::{DetectionError, Detector};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct SubprocessDetector {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl SubprocessDetector {
    /// Spawn the detector process. `command` is the program followed by its
    /// arguments.
    pub fn spawn(command: &[String], workdir: Option<&Path>) -> Result<Self, DetectionError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| DetectionError::Unavailable("detector command is empty".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            DetectionError::Unavailable(format!("failed to start detector {}: {}", program, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DetectionError::Unavailable("detector stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectionError::Unavailable("detector stdout not captured".to_string()))?;

        tracing::info!(program = %program, pid = ?child.id(), "Detector process started");

        Ok(Self {
            program: program.clone(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }
}

/// Parse one response line into a face count.
fn parse_face_count(line: &str) -> Result<u32, DetectionError> {
    let trimmed = line.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| DetectionError::BadResult(format!("not an integer: {:?}", trimmed)))?;
    u32::try_from(value)
        .map_err(|_| DetectionError::BadResult(format!("face count out of range: {}", value)))
}

#[async_trait]
impl Detector for SubprocessDetector {
    fn name(&self) -> &str {
        &self.program
    }

    async fn detect(&mut self, path: &Path) -> Result<u32, DetectionError> {
        let path_str = path.to_str().ok_or_else(|| {
            DetectionError::NotFound(format!("non UTF-8 path: {}", path.display()))
        })?;
        if path_str.contains('\n') {
            return Err(DetectionError::NotFound(format!(
                "path contains a newline: {:?}",
                path_str
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DetectionError::Unavailable("detector has been shut down".to_string()))?;

        let request = format!("{}\n", path_str);
        stdin
            .write_all(request.as_bytes())
            .await
            .map_err(|e| DetectionError::Unavailable(format!("write to detector: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| DetectionError::Unavailable(format!("flush detector stdin: {}", e)))?;

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| DetectionError::Unavailable(format!("read from detector: {}", e)))?;
        if read == 0 {
            return Err(DetectionError::Unavailable(
                "detector process closed its output".to_string(),
            ));
        }

        parse_face_count(&line)
    }

    async fn shutdown(&mut self) -> Result<(), DetectionError> {
        drop(self.stdin.take());

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(program = %self.program, %status, "Detector process exited");
                Ok(())
            }
            Ok(Err(e)) => Err(DetectionError::Unavailable(format!(
                "waiting for detector: {}",
                e
            ))),
            Err(_) => {
                tracing::warn!(program = %self.program, "Detector did not exit in time, killing it");
                self.child
                    .kill()
                    .await
                    .map_err(|e| DetectionError::Unavailable(format!("kill detector: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_face_count() {
        assert_eq!(parse_face_count("2\n"), Ok(2));
        assert_eq!(parse_face_count(" 0 "), Ok(0));
        assert!(matches!(parse_face_count("-1"), Err(DetectionError::BadResult(_))));
        assert!(matches!(parse_face_count("two"), Err(DetectionError::BadResult(_))));
        assert!(matches!(parse_face_count(""), Err(DetectionError::BadResult(_))));
    }

    #[test]
    fn test_spawn_rejects_empty_command() {
        let result = SubprocessDetector::spawn(&[], None);
        assert!(matches!(result, Err(DetectionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_spawn_reports_missing_program() {
        let command = vec!["/definitely/not/a/detector".to_string()];
        let result = SubprocessDetector::spawn(&command, None);
        assert!(matches!(result, Err(DetectionError::Unavailable(_))));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_line_protocol_round_trip() {
        let mut detector =
            SubprocessDetector::spawn(&sh("while read p; do echo 2; done"), None).unwrap();

        assert_eq!(detector.detect(Path::new("/tmp/a.png")).await, Ok(2));
        assert_eq!(detector.detect(Path::new("/tmp/b.png")).await, Ok(2));

        detector.shutdown().await.unwrap();
        assert!(matches!(
            detector.detect(Path::new("/tmp/c.png")).await,
            Err(DetectionError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_integer_answer_is_bad_result() {
        let mut detector =
            SubprocessDetector::spawn(&sh("while read p; do echo faces; done"), None).unwrap();

        assert!(matches!(
            detector.detect(Path::new("/tmp/a.png")).await,
            Err(DetectionError::BadResult(_))
        ));
        detector.shutdown().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exited_process_is_unavailable() {
        let mut detector = SubprocessDetector::spawn(&sh("exit 0"), None).unwrap();

        assert!(matches!(
            detector.detect(Path::new("/tmp/a.png")).await,
            Err(DetectionError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_workdir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("count.txt"), "5\n").unwrap();

        let mut detector = SubprocessDetector::spawn(
            &sh("while read p; do cat count.txt; done"),
            Some(dir.path()),
        )
        .unwrap();

        assert_eq!(detector.detect(Path::new("x.png")).await, Ok(5));
        detector.shutdown().await.unwrap();
    }
}
