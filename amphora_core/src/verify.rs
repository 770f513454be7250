//! One-shot environment verification for the deploy toolchain.
//!
//! Audits the local Node.js runtime and the project's `package.json`,
//! `amplify.yml`, and `.nvmrc` against the pinned deploy requirements. Every
//! check is independent and order-insensitive: a file that cannot be read
//! produces an error line and the report continues. The report is a
//! human-readable transcript, not an automated gate; it carries no exit
//! status.

use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Lowest Node.js major version the deploy pipeline supports.
pub const REQUIRED_NODE_MAJOR: u32 = 20;

/// CDK pin known to be incompatible when installed by the pipeline.
const PINNED_CDK: &str = "aws-cdk@2.138.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Plain informational line, no marker.
    Info,
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckLine {
    pub status: CheckStatus,
    pub message: String,
}

impl CheckLine {
    fn info(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Info,
            message: message.into(),
        }
    }

    fn pass(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warn,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: message.into(),
        }
    }
}

impl fmt::Display for CheckLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            CheckStatus::Info => write!(f, "{}", self.message),
            CheckStatus::Pass => write!(f, "✅ {}", self.message),
            CheckStatus::Warn => write!(f, "⚠️ WARNING: {}", self.message),
            CheckStatus::Fail => write!(f, "❌ ERROR: {}", self.message),
        }
    }
}

/// The full verification transcript.
#[derive(Debug, Clone, Default)]
pub struct EnvReport {
    pub lines: Vec<CheckLine>,
}

impl EnvReport {
    pub fn count(&self, status: CheckStatus) -> usize {
        self.lines.iter().filter(|l| l.status == status).count()
    }
}

impl fmt::Display for EnvReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Run every check against `root` and collect the transcript.
pub fn run<P: AsRef<Path>>(root: P) -> EnvReport {
    let root = root.as_ref();
    debug!("Running environment verification in {:?}", root);

    let mut lines = vec![CheckLine::info("=== Environment Verification ===")];

    match local_node_version() {
        Ok(version) => lines.extend(check_runtime_version(&version)),
        Err(e) => lines.push(CheckLine::fail(format!(
            "Could not determine Node.js version: {}",
            e
        ))),
    }

    lines.push(CheckLine::info(""));
    lines.push(CheckLine::info("=== Package Manifest ==="));
    lines.extend(check_package_manifest(root));

    lines.push(CheckLine::info(""));
    lines.push(CheckLine::info("=== Pipeline Configuration ==="));
    lines.extend(check_pipeline(root));

    lines.push(CheckLine::info(""));
    lines.extend(check_node_pin(root));

    lines.push(CheckLine::info(""));
    lines.push(CheckLine::info("=== Verification Complete ==="));

    EnvReport { lines }
}

/// Ask the local `node` binary for its version string.
pub fn local_node_version() -> Result<String, std::io::Error> {
    let output = Command::new("node").arg("--version").output()?;
    if !output.status.success() {
        return Err(std::io::Error::other(format!(
            "node --version exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Check a `vMAJOR.MINOR.PATCH` runtime version string against the required
/// major. Pure so it is testable without a Node installation.
pub fn check_runtime_version(version: &str) -> Vec<CheckLine> {
    let mut lines = vec![CheckLine::info(format!("Node.js version: {}", version))];

    match parse_major(version) {
        Some(major) if major >= REQUIRED_NODE_MAJOR => lines.push(CheckLine::pass(format!(
            "Node.js version {} meets the requirement (v{}.x.x or higher)",
            version, REQUIRED_NODE_MAJOR
        ))),
        Some(_) => lines.push(CheckLine::fail(format!(
            "Node.js version {} does not meet the requirement (v{}.x.x or higher)",
            version, REQUIRED_NODE_MAJOR
        ))),
        None => lines.push(CheckLine::fail(format!(
            "Could not parse Node.js version '{}'",
            version
        ))),
    }

    lines
}

fn parse_major(version: &str) -> Option<u32> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .next()?
        .parse()
        .ok()
}

/// `package.json`: CDK and CDK-lib dev-dependency versions must match, and
/// an engines.node requirement should be declared.
pub fn check_package_manifest(root: &Path) -> Vec<CheckLine> {
    let path = root.join("package.json");
    let manifest: Value = match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
    {
        Ok(manifest) => manifest,
        Err(e) => {
            return vec![CheckLine::fail(format!(
                "Could not read package.json: {}",
                e
            ))]
        }
    };

    let mut lines = Vec::new();

    let dev_dependency = |name: &str| -> String {
        manifest["devDependencies"][name]
            .as_str()
            .unwrap_or("Not installed")
            .to_string()
    };
    let cdk = dev_dependency("aws-cdk");
    let cdk_lib = dev_dependency("aws-cdk-lib");

    lines.push(CheckLine::info(format!("AWS CDK version: {}", cdk)));
    lines.push(CheckLine::info(format!("AWS CDK Lib version: {}", cdk_lib)));

    if cdk == cdk_lib {
        lines.push(CheckLine::pass("AWS CDK and AWS CDK Lib versions match"));
    } else {
        lines.push(CheckLine::warn(
            "AWS CDK and AWS CDK Lib versions do not match",
        ));
    }

    match manifest["engines"]["node"].as_str() {
        Some(requirement) => {
            lines.push(CheckLine::info(format!(
                "Node.js version requirement in package.json: {}",
                requirement
            )));
            lines.push(CheckLine::pass(
                "package.json has Node.js version requirement",
            ));
        }
        None => lines.push(CheckLine::warn(
            "package.json does not specify Node.js version requirement",
        )),
    }

    lines
}

/// `amplify.yml`: the pipeline must install a usable CDK and Node 20, and
/// its commands should be quoted against YAML parsing surprises. These are
/// substring checks over the raw file, matching how the pipeline itself
/// treats the content.
pub fn check_pipeline(root: &Path) -> Vec<CheckLine> {
    let path = root.join("amplify.yml");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            return vec![CheckLine::fail(format!(
                "Could not read amplify.yml: {}",
                e
            ))]
        }
    };

    let mut lines = Vec::new();

    if content.contains("aws-cdk@latest") {
        lines.push(CheckLine::pass(
            "amplify.yml installs the latest AWS CDK version",
        ));
    } else if content.contains(PINNED_CDK) {
        lines.push(CheckLine::warn(format!(
            "amplify.yml installs a specific AWS CDK version ({}), which might not be compatible",
            PINNED_CDK
        )));
    } else {
        lines.push(CheckLine::fail("amplify.yml does not install AWS CDK"));
    }

    if content.contains("nvm install 20") && content.contains("nvm use 20") {
        lines.push(CheckLine::pass(
            "amplify.yml uses nvm to install and use Node.js 20",
        ));
    } else if content.contains("NODE_VERSION: \"20\"") {
        lines.push(CheckLine::warn(
            "amplify.yml specifies NODE_VERSION: \"20\" as an environment variable, which might not work",
        ));
    } else {
        lines.push(CheckLine::fail("amplify.yml does not specify Node.js 20"));
    }

    if content.contains("nvm use") {
        lines.push(CheckLine::warn(
            "amplify.yml contains \"nvm use\" commands which might not work in all environments",
        ));
    } else {
        lines.push(CheckLine::pass(
            "amplify.yml does not contain \"nvm use\" commands",
        ));
    }

    if content.contains("'echo") || content.contains("'npm") {
        lines.push(CheckLine::pass(
            "amplify.yml commands are properly quoted to avoid YAML syntax issues",
        ));
    } else {
        lines.push(CheckLine::warn(
            "amplify.yml commands are not properly quoted, which may cause YAML syntax issues",
        ));
    }

    lines
}

/// `.nvmrc`: must exist and pin Node 20.
pub fn check_node_pin(root: &Path) -> Vec<CheckLine> {
    let path = root.join(".nvmrc");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content.trim().to_string(),
        Err(e) => return vec![CheckLine::fail(format!("Could not read .nvmrc: {}", e))],
    };

    let mut lines = vec![
        CheckLine::info(format!(".nvmrc content: {}", content)),
        CheckLine::pass(".nvmrc file exists"),
    ];

    if content.starts_with("20") {
        lines.push(CheckLine::pass(".nvmrc specifies Node.js 20"));
    } else {
        lines.push(CheckLine::warn(format!(
            ".nvmrc specifies Node.js {}, but {} is required",
            content, REQUIRED_NODE_MAJOR
        )));
    }

    lines
}
