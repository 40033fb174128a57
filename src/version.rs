//! Asking the Flutter tool which framework and Dart SDK it ships.
//!
//! `flutter --version --machine` prints a JSON object; the two fields of
//! interest are `frameworkVersion` and `dartSdkVersion`. Both may carry
//! pre-release suffixes (`3.1.0-dev.1`), which are ignored.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::notify::{Notifier, NotifyOptions, Severity};

static TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid version regex"));

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    /// Parse the first `a.b.c` triple found in `text`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = TRIPLE.captures(text)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
        })
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Versions reported by the Flutter tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdkVersions {
    pub flutter: SemVer,
    pub dart: SemVer,
}

/// JSON shape printed by `flutter --version --machine`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MachineVersion {
    framework_version: Option<String>,
    dart_sdk_version: Option<String>,
}

/// Errors that can occur while probing versions.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} --version failed: {stderr}")]
    Exit { program: String, stderr: String },

    #[error("{program} did not report its version within {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("version output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("version output has no `{0}`")]
    MissingField(&'static str),

    #[error("failed to parse {field} version: `{value}`")]
    Version { field: &'static str, value: String },
}

/// Parse the machine-readable version report.
///
/// Anything before the first `{` is skipped; the tool sometimes prints a
/// banner ahead of the JSON.
pub fn parse_versions(stdout: &str) -> Result<SdkVersions, ProbeError> {
    let json = match (stdout.find('{'), stdout.rfind('}')) {
        (Some(start), Some(end)) if start < end => &stdout[start..=end],
        _ => stdout,
    };
    let report: MachineVersion = serde_json::from_str(json)?;

    let framework = report
        .framework_version
        .ok_or(ProbeError::MissingField("frameworkVersion"))?;
    let dart_sdk = report
        .dart_sdk_version
        .ok_or(ProbeError::MissingField("dartSdkVersion"))?;

    let flutter = SemVer::parse(&framework).ok_or_else(|| ProbeError::Version {
        field: "flutter",
        value: framework.clone(),
    })?;
    let dart = SemVer::parse(&dart_sdk).ok_or_else(|| ProbeError::Version {
        field: "dart",
        value: dart_sdk.clone(),
    })?;

    Ok(SdkVersions { flutter, dart })
}

/// Runs the Flutter tool and reads its version report.
#[derive(Debug, Clone)]
pub struct VersionProbe {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl Default for VersionProbe {
    fn default() -> Self {
        Self::new("flutter")
    }
}

impl VersionProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec!["--version".into(), "--machine".into()],
            timeout: None,
        }
    }

    /// Replace the arguments passed to the tool.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Give up after `timeout`. Without one, a hung tool is waited on forever.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the tool and parse what it prints.
    pub async fn probe(&self) -> Result<SdkVersions, ProbeError> {
        let program = self.program.display().to_string();
        debug!(%program, args = ?self.args, "probing versions");

        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);

        let output = match self.timeout {
            Some(after) => tokio::time::timeout(after, command.output())
                .await
                .map_err(|_| ProbeError::Timeout {
                    program: program.clone(),
                    after,
                })?,
            None => command.output().await,
        }
        .map_err(|source| ProbeError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProbeError::Exit { program, stderr });
        }

        parse_versions(&String::from_utf8_lossy(&output.stdout))
    }

    /// Probe and hand `(flutter, dart)` to `callback` on success.
    ///
    /// On failure the error goes to `notifier` and `callback` is dropped
    /// without being called.
    pub async fn version<N, C>(&self, notifier: &mut N, callback: C)
    where
        N: Notifier,
        C: FnOnce(SemVer, SemVer),
    {
        match self.probe().await {
            Ok(versions) => callback(versions.flutter, versions.dart),
            Err(e) => {
                warn!("version probe failed: {e}");
                notifier.notify(&e.to_string(), Severity::Error, NotifyOptions::default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::notify::RecordingNotifier;

    const REPORT: &str = r#"{"frameworkVersion":"3.13.2","dartSdkVersion":"3.1.0-dev.1"}"#;

    fn v(major: u64, minor: u64, patch: u64) -> SemVer {
        SemVer {
            major,
            minor,
            patch,
        }
    }

    #[test]
    fn parses_machine_report() {
        let versions = parse_versions(REPORT).unwrap();
        assert_eq!(versions.flutter, v(3, 13, 2));
        assert_eq!(versions.dart, v(3, 1, 0));
    }

    #[test]
    fn skips_banner_before_json() {
        let stdout = format!(
            "Waiting for another flutter command to release the startup lock...\n{REPORT}\n"
        );
        let versions = parse_versions(&stdout).unwrap();
        assert_eq!(versions.flutter, v(3, 13, 2));
    }

    #[test]
    fn semver_ignores_suffixes_and_needs_three_parts() {
        assert_eq!(SemVer::parse("2.19.0-146.2.beta"), Some(v(2, 19, 0)));
        assert_eq!(SemVer::parse("v10.0.1+hotfix"), Some(v(10, 0, 1)));
        assert_eq!(SemVer::parse("3.13"), None);
        assert_eq!(SemVer::parse("unknown"), None);
        assert_eq!(v(3, 1, 0).to_string(), "3.1.0");
    }

    #[test]
    fn bad_version_names_the_field() {
        let err =
            parse_versions(r#"{"frameworkVersion":"3.13.2","dartSdkVersion":"main"}"#).unwrap_err();
        assert!(matches!(err, ProbeError::Version { field: "dart", .. }));
        assert_eq!(err.to_string(), "failed to parse dart version: `main`");
    }

    #[test]
    fn missing_field_is_an_error() {
        let err = parse_versions(r#"{"frameworkVersion":"3.13.2"}"#).unwrap_err();
        assert!(matches!(err, ProbeError::MissingField("dartSdkVersion")));
    }

    #[test]
    fn garbage_is_a_json_error() {
        let err = parse_versions("Flutter 3.13.2 • channel stable").unwrap_err();
        assert!(matches!(err, ProbeError::Json(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_probe_calls_back_once() {
        let script = format!("echo '{REPORT}'");
        let probe = VersionProbe::new("sh").with_args(["-c", script.as_str()]);
        let mut notifier = RecordingNotifier::default();
        let mut calls = Vec::new();

        probe
            .version(&mut notifier, |flutter, dart| calls.push((flutter, dart)))
            .await;

        assert_eq!(calls, vec![(v(3, 13, 2), v(3, 1, 0))]);
        assert!(notifier.messages.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_never_calls_back() {
        let probe = VersionProbe::new("sh")
            .with_args(["-c", "echo 'not a flutter project' >&2; exit 1"]);
        let mut notifier = RecordingNotifier::default();
        let mut called = false;

        probe.version(&mut notifier, |_, _| called = true).await;

        assert!(!called);
        assert_eq!(
            notifier.errors(),
            vec!["sh --version failed: not a flutter project"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_tool_times_out() {
        let probe = VersionProbe::new("sh")
            .with_args(["-c", "sleep 5"])
            .with_timeout(Some(Duration::from_millis(100)));

        let err = probe.probe().await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_tool_is_a_spawn_error() {
        let probe = VersionProbe::new("/nonexistent/flutter-log-test/flutter");
        let err = probe.probe().await.unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }
}
