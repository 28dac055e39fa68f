//! Core data model: screens, code flows, framework detection and analysis records.
//!
//! These types are the unit of persistence and the unit of comparison across
//! commits. Field names serialize in camelCase so stored records match what
//! downstream consumers (diagram renderer, screenshot workers) read.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Framework conventions the detector knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    NextjsApp,
    NextjsPages,
    Remix,
    Sveltekit,
    Nuxt,
    Cli,
}

impl Framework {
    /// All frameworks in tie-break order.
    pub const ALL: [Framework; 6] = [
        Framework::NextjsApp,
        Framework::NextjsPages,
        Framework::Remix,
        Framework::Sveltekit,
        Framework::Nuxt,
        Framework::Cli,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::NextjsApp => "nextjs-app",
            Framework::NextjsPages => "nextjs-pages",
            Framework::Remix => "remix",
            Framework::Sveltekit => "sveltekit",
            Framework::Nuxt => "nuxt",
            Framework::Cli => "cli",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Framework::ALL.iter().copied().find(|f| f.as_str() == s)
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tag used on screens when no framework cleared the detection threshold.
pub const GENERIC_FRAMEWORK: &str = "generic";

/// Kind of navigable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenKind {
    Page,
    Screen,
    View,
    CliCommand,
}

impl ScreenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenKind::Page => "page",
            ScreenKind::Screen => "screen",
            ScreenKind::View => "view",
            ScreenKind::CliCommand => "cli-command",
        }
    }
}

impl std::fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowKind {
    UiEvent,
    FunctionCall,
    ApiCall,
    DbQuery,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::UiEvent => "ui-event",
            FlowKind::FunctionCall => "function-call",
            FlowKind::ApiCall => "api-call",
            FlowKind::DbQuery => "db-query",
        }
    }
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Screenshot lifecycle of a screen: none -> pending -> ok | error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotStatus {
    #[default]
    None,
    Pending,
    Ok,
    Error,
}

impl std::fmt::Display for ScreenshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenshotStatus::None => write!(f, "none"),
            ScreenshotStatus::Pending => write!(f, "pending"),
            ScreenshotStatus::Ok => write!(f, "ok"),
            ScreenshotStatus::Error => write!(f, "error"),
        }
    }
}

/// A reachable UI surface or CLI command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: String,
    pub name: String,
    pub route_path: String,
    pub source_file: String,
    /// Content hash of `source_file` at `last_analyzed_commit`.
    #[serde(default)]
    pub source_hash: String,
    pub kind: ScreenKind,
    /// Ordered set of owned flow ids.
    #[serde(default)]
    pub flow_ids: Vec<String>,
    #[serde(default)]
    pub navigates_to: BTreeSet<String>,
    pub framework: String,
    pub last_analyzed_commit: String,
    #[serde(default)]
    pub screenshot_status: ScreenshotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_screenshot_commit: Option<String>,
    /// Fingerprint (source hash + route) at the last successful capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_error: Option<String>,
}

impl Screen {
    /// Mark the screen as selected for capture.
    ///
    /// `last_screenshot_commit` and the fingerprint survive until the capture
    /// resolves; the url is cleared because it is only valid while `ok`.
    pub fn mark_pending(&mut self) {
        self.screenshot_status = ScreenshotStatus::Pending;
        self.screenshot_url = None;
        self.screenshot_error = None;
    }

    /// Record a successful capture taken at `commit`.
    pub fn record_capture(&mut self, url: String, commit: &str, fingerprint: String) {
        self.screenshot_status = ScreenshotStatus::Ok;
        self.screenshot_url = Some(url);
        self.screenshot_error = None;
        self.last_screenshot_commit = Some(commit.to_string());
        self.screenshot_fingerprint = Some(fingerprint);
    }

    /// Record a failed capture. `last_screenshot_commit` is left untouched.
    pub fn record_failure(&mut self, error: String) {
        self.screenshot_status = ScreenshotStatus::Error;
        self.screenshot_url = None;
        self.screenshot_error = Some(error);
    }

    /// Screenshot fields copied from a previous record's version of this screen.
    pub fn inherit_screenshot(&mut self, previous: &Screen) {
        self.screenshot_status = previous.screenshot_status;
        self.screenshot_url = previous.screenshot_url.clone();
        self.last_screenshot_commit = previous.last_screenshot_commit.clone();
        self.screenshot_fingerprint = previous.screenshot_fingerprint.clone();
        self.screenshot_error = previous.screenshot_error.clone();
    }
}

/// A classified unit of behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFlow {
    pub id: String,
    pub kind: FlowKind,
    pub name: String,
    pub source_file: String,
    pub line: usize,
    pub snippet: String,
    #[serde(default)]
    pub calls: BTreeSet<String>,
}

/// Score for one framework candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkCandidate {
    pub framework: Framework,
    pub score: u32,
    /// Names of the signature rules that matched.
    pub signals: Vec<String>,
}

/// Output of the framework detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkDetection {
    pub detected: Vec<FrameworkCandidate>,
    pub primary: Option<Framework>,
    pub confidence: f64,
}

impl FrameworkDetection {
    /// Tag stamped on screens: the primary framework or `generic`.
    pub fn tag(&self) -> &'static str {
        self.primary
            .map(|f| f.as_str())
            .unwrap_or(GENERIC_FRAMEWORK)
    }
}

/// Which extraction ceiling was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitKind {
    ImportDepth,
    FilesPerScreen,
    TotalFiles,
    FileSize,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitKind::ImportDepth => write!(f, "import-depth"),
            LimitKind::FilesPerScreen => write!(f, "files-per-screen"),
            LimitKind::TotalFiles => write!(f, "total-files"),
            LimitKind::FileSize => write!(f, "file-size"),
        }
    }
}

/// A bounded-traversal ceiling that stopped extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truncation {
    pub limit: LimitKind,
    pub value: usize,
    /// Screen source file, or `*` for scan-wide ceilings.
    pub scope: String,
}

/// A file that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// A reference to a flow id that did not exist and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    /// Screen id or flow id holding the reference.
    pub owner: String,
    pub missing: String,
}

/// Coverage signal: how complete the extraction is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    #[serde(default)]
    pub files_skipped: Vec<SkippedFile>,
    #[serde(default)]
    pub truncations: Vec<Truncation>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub dangling_dropped: Vec<DanglingReference>,
}

impl Coverage {
    pub fn add_truncation(&mut self, limit: LimitKind, value: usize, scope: &str) {
        let truncation = Truncation {
            limit,
            value,
            scope: scope.to_string(),
        };
        if !self.truncations.contains(&truncation) {
            self.truncations.push(truncation);
        }
        self.truncated = true;
    }

    pub fn add_skipped(&mut self, path: &str, reason: impl Into<String>) {
        self.files_skipped.push(SkippedFile {
            path: path.to_string(),
            reason: reason.into(),
        });
    }
}

/// The persisted result of one scan of a repo+branch at a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub repo: String,
    pub branch: String,
    pub commit_sha: String,
    pub timestamp: DateTime<Utc>,
    pub screens: Vec<Screen>,
    pub flows: Vec<CodeFlow>,
    pub framework: FrameworkDetection,
    pub flows_count: usize,
    pub files_analyzed: usize,
    #[serde(default)]
    pub coverage: Coverage,
}

impl AnalysisRecord {
    /// Store key for the latest record of a (repo, branch).
    pub fn store_key(repo: &str, branch: &str) -> String {
        format!("analysis:{}:{}", repo, branch)
    }

    /// Index key mapping an analysis id to its store key.
    pub fn id_key(analysis_id: &str) -> String {
        format!("analysis-id:{}", analysis_id)
    }

    pub fn key(&self) -> String {
        Self::store_key(&self.repo, &self.branch)
    }

    pub fn screen(&self, id: &str) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id == id)
    }

    pub fn screen_mut(&mut self, id: &str) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|s| s.id == id)
    }

    pub fn flow(&self, id: &str) -> Option<&CodeFlow> {
        self.flows.iter().find(|f| f.id == id)
    }

    /// The response shape handed back by `analyze`.
    pub fn to_result(&self) -> AnalysisResult {
        AnalysisResult {
            analysis_id: self.analysis_id.clone(),
            commit_sha: self.commit_sha.clone(),
            screens: self.screens.clone(),
            flows: self.flows.clone(),
            framework: self.framework.clone(),
            coverage: self.coverage.clone(),
        }
    }
}

/// Result of `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub commit_sha: String,
    pub screens: Vec<Screen>,
    pub flows: Vec<CodeFlow>,
    pub framework: FrameworkDetection,
    pub coverage: Coverage,
}

/// A screen as named in a capture request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRef {
    pub id: String,
    pub name: String,
    pub path: String,
}

impl From<&Screen> for ScreenRef {
    fn from(screen: &Screen) -> Self {
        Self {
            id: screen.id.clone(),
            name: screen.name.clone(),
            path: screen.route_path.clone(),
        }
    }
}

/// Terminal status of a single capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Ok,
    Error,
}

/// Outcome of capturing one screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResult {
    pub screen_id: String,
    pub status: CaptureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
}

/// Response of `capture_screenshots`. Partial success is the normal case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub captured: usize,
    pub total: usize,
    /// Requested screens that did not need a new capture.
    pub skipped: usize,
    pub results: Vec<ScreenshotResult>,
}

impl CaptureResponse {
    pub fn failed(&self) -> usize {
        self.total - self.captured
    }
}
