use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::comment_text::first_line;

pub const DEFAULT_REPORT_WINDOW_DAYS: u32 = 7;
pub const COMMIT_SHA_DISPLAY_CHARS: usize = 7;
const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Issue row reported by an activity source.
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Pull request row reported by an activity source.
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Commit row reported by an activity source.
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Assembled activity digest; lives for one `/report` dispatch.
pub struct ActivityDigest {
    pub window_days: u32,
    pub issues: Vec<IssueSummary>,
    pub pull_requests: Vec<PullRequestSummary>,
    pub commits: Vec<CommitSummary>,
    pub generated_at: NaiveDateTime,
}

/// Resolve the `/report` lookback window from its raw arguments.
///
/// Reads a leading, optionally signed integer the way `%d` scanning does.
/// Empty, non-numeric, out-of-range, and non-positive input all yield the
/// default window instead of an error.
pub fn parse_report_window_days(args: &str) -> u32 {
    let trimmed = args.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = unsigned
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    if digits_len == 0 || negative {
        return DEFAULT_REPORT_WINDOW_DAYS;
    }
    match unsigned[..digits_len].parse::<u32>() {
        Ok(days) if days > 0 => days,
        _ => DEFAULT_REPORT_WINDOW_DAYS,
    }
}

/// First seven characters of a commit id; shorter ids are returned whole.
pub fn abbreviate_commit_sha(sha: &str) -> &str {
    match sha.char_indices().nth(COMMIT_SHA_DISPLAY_CHARS) {
        Some((index, _)) => &sha[..index],
        None => sha,
    }
}

/// Render the markdown activity report posted in reply to `/report`.
pub fn render_activity_report(digest: &ActivityDigest) -> String {
    let mut report = format!(
        "📊 **{}-day activity report**\n\n### 📝 Issues ({})\n",
        digest.window_days,
        digest.issues.len()
    );
    for issue in &digest.issues {
        report.push_str(&format!(
            "- #{}: {} ({})\n",
            issue.number, issue.title, issue.state
        ));
    }

    report.push_str(&format!(
        "\n### 🔀 Pull Requests ({})\n",
        digest.pull_requests.len()
    ));
    for pull_request in &digest.pull_requests {
        report.push_str(&format!(
            "- #{}: {} ({})\n",
            pull_request.number, pull_request.title, pull_request.state
        ));
    }

    report.push_str(&format!(
        "\n### 💾 Recent commits ({})\n",
        digest.commits.len()
    ));
    for commit in &digest.commits {
        report.push_str(&format!(
            "- {}: {}\n",
            abbreviate_commit_sha(&commit.sha),
            first_line(&commit.message)
        ));
    }

    report.push_str(&format!(
        "\n---\n*Generated at: {}*",
        digest.generated_at.format(REPORT_TIMESTAMP_FORMAT)
    ));
    report
}
