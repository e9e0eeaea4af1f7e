//! Fabricated dashboard data: activity feed, health trend, issue mix, and issues.
//!
//! Every generator is a plain function over an explicit clock reading and
//! [`RandomSource`]; there is no shared generator state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::OutcomeStatus;
use crate::random::{RandomSource, choose};

const USERS: [&str; 8] = [
    "John Smith",
    "Sarah Johnson",
    "Mike Chen",
    "Emma Wilson",
    "David Rodriguez",
    "Lisa Anderson",
    "Tom Brown",
    "Anna Martinez",
];

const ACTIONS: [&str; 10] = [
    "Resolved clash issue",
    "Uploaded new model version",
    "Added property set validation rule",
    "Fixed geometry error",
    "Updated material properties",
    "Completed model review",
    "Assigned issue to team member",
    "Approved model validation",
    "Created custom rule",
    "Generated compliance report",
];

const ACTIVITY_TYPES: [&str; 4] = ["resolution", "upload", "configuration", "review"];
const ELEMENT_TYPES: [&str; 6] = ["IfcWall", "IfcSlab", "IfcBeam", "IfcColumn", "IfcDoor", "IfcWindow"];
const ISSUE_STATES: [&str; 4] = ["Open", "In Progress", "Resolved", "Closed"];
const ISSUE_PRIORITIES: [&str; 4] = ["Low", "Medium", "High", "Critical"];

/// A kind of issue the dashboard reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueType {
    /// Display name.
    pub name: &'static str,
    /// Severity of issues of this kind.
    pub severity: OutcomeStatus,
    /// Short description.
    pub description: &'static str,
}

/// Issue kinds used by the fabricated dashboards.
pub const ISSUE_TYPES: [IssueType; 6] = [
    IssueType {
        name: "Missing Properties",
        severity: OutcomeStatus::Warning,
        description: "Elements missing required property sets",
    },
    IssueType {
        name: "Geometry Clashes",
        severity: OutcomeStatus::Critical,
        description: "Physical interferences detected",
    },
    IssueType {
        name: "Naming Convention",
        severity: OutcomeStatus::Info,
        description: "Non-standard naming detected",
    },
    IssueType {
        name: "Material Data",
        severity: OutcomeStatus::Warning,
        description: "Incomplete material information",
    },
    IssueType {
        name: "Schema Validation",
        severity: OutcomeStatus::Critical,
        description: "IFC schema compliance issues",
    },
    IssueType {
        name: "Unit Consistency",
        severity: OutcomeStatus::Warning,
        description: "Inconsistent units detected",
    },
];

/// Activity feed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityEntry {
    /// Entry identifier.
    pub id: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Acting user.
    pub user: String,
    /// What happened.
    pub action: String,
    /// Activity kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Project label.
    pub project: String,
}

/// One day of the health trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendPoint {
    /// Calendar date (`YYYY-MM-DD`).
    pub date: String,
    /// Average score on that day.
    pub score: f64,
    /// Projects analysed that day.
    pub projects: u32,
}

/// Issue count for one issue kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IssueShare {
    /// Issue kind name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Issue count.
    pub count: u32,
    /// Severity of the kind.
    pub severity: OutcomeStatus,
    /// Share of all issues, in percent with one decimal.
    pub percentage: f64,
}

/// Model coordinates of an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// Where in the building an issue sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IssueLocation {
    /// Storey label.
    pub story: String,
    /// Model coordinates.
    pub coordinates: Coordinates,
}

/// Comment left on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IssueComment {
    /// Author.
    pub user: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Comment text.
    pub message: String,
}

/// Fabricated issue attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectIssue {
    /// Issue identifier.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Issue kind name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Severity.
    pub severity: OutcomeStatus,
    /// Kind description.
    pub description: String,
    /// Affected element id.
    pub element_id: String,
    /// Affected element type.
    pub element_type: String,
    /// Workflow state.
    pub status: String,
    /// Assignee.
    pub assigned_to: String,
    /// Priority label.
    pub priority: String,
    /// ISO-8601 creation timestamp.
    pub created_date: String,
    /// Location in the model.
    pub location: IssueLocation,
    /// Longer description.
    pub details: String,
    /// Discussion.
    pub comments: Vec<IssueComment>,
}

/// Fabricate `count` activity entries from the last `days` days, newest first.
pub fn recent_activity<R: RandomSource + ?Sized>(
    now: DateTime<Utc>,
    days: u32,
    count: usize,
    rng: &mut R,
) -> Vec<ActivityEntry> {
    let mut entries: Vec<(DateTime<Utc>, ActivityEntry)> = (0..count)
        .map(|_| {
            let offset_minutes = rng.uniform(0.0, f64::from(days) * 24.0 * 60.0)
                + rng.uniform(0.0, 24.0 * 60.0)
                + rng.uniform(0.0, 60.0);
            let at = now - Duration::seconds((offset_minutes * 60.0) as i64);
            let entry = ActivityEntry {
                id: random_id(rng),
                timestamp: at.to_rfc3339(),
                user: pick(rng, &USERS),
                action: pick(rng, &ACTIONS),
                kind: pick(rng, &ACTIVITY_TYPES),
                project: format!("Project {}", rng.range_u64(1, 20)),
            };
            (at, entry)
        })
        .collect();
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    entries.into_iter().map(|(_, entry)| entry).collect()
}

/// Fabricate a daily health trend ending today.
pub fn health_trend<R: RandomSource + ?Sized>(
    now: DateTime<Utc>,
    days: u32,
    rng: &mut R,
) -> Vec<TrendPoint> {
    let mut score = rng.uniform(70.0, 85.0);
    (0..days)
        .map(|day| {
            let date = now - Duration::days(i64::from(days - day - 1));
            score = (score + rng.uniform(-3.0, 5.0)).clamp(0.0, 100.0);
            TrendPoint {
                date: date.format("%Y-%m-%d").to_string(),
                score: round_one(score),
                projects: rng.range_u64(1, 5) as u32,
            }
        })
        .collect()
}

/// Fabricate how issues split across issue kinds.
pub fn issue_distribution<R: RandomSource + ?Sized>(rng: &mut R) -> Vec<IssueShare> {
    let total = rng.range_u64(50, 300);
    let mut remaining = total;

    ISSUE_TYPES
        .iter()
        .map(|issue_type| {
            let count = if remaining == 0 {
                0
            } else {
                let upper = remaining.min(total / 2);
                let count = rng.range_u64(0, upper);
                remaining -= count;
                count
            };
            IssueShare {
                kind: issue_type.name.to_string(),
                count: count as u32,
                severity: issue_type.severity,
                percentage: round_one(count as f64 / total as f64 * 100.0),
            }
        })
        .collect()
}

/// Fabricate `count` issues for a project.
pub fn project_issues<R: RandomSource + ?Sized>(
    now: DateTime<Utc>,
    project_id: &str,
    count: usize,
    rng: &mut R,
) -> Vec<ProjectIssue> {
    (0..count)
        .map(|_| {
            let issue_type = choose(rng, &ISSUE_TYPES).copied().unwrap_or(ISSUE_TYPES[0]);
            let created = now - Duration::days(rng.range_u64(1, 30) as i64);
            let commented = now - Duration::hours(rng.range_u64(1, 48) as i64);
            ProjectIssue {
                id: random_id(rng),
                project_id: project_id.to_string(),
                kind: issue_type.name.to_string(),
                severity: issue_type.severity,
                description: issue_type.description.to_string(),
                element_id: format!("Element_{}", rng.range_u64(1_000, 9_999)),
                element_type: pick(rng, &ELEMENT_TYPES),
                status: pick(rng, &ISSUE_STATES),
                assigned_to: pick(rng, &USERS),
                priority: pick(rng, &ISSUE_PRIORITIES),
                created_date: created.to_rfc3339(),
                location: IssueLocation {
                    story: format!("Level {}", rng.range_u64(1, 10)),
                    coordinates: Coordinates {
                        x: round_two(rng.uniform(0.0, 100.0)),
                        y: round_two(rng.uniform(0.0, 100.0)),
                        z: round_two(rng.uniform(0.0, 30.0)),
                    },
                },
                details: format!(
                    "Detailed description of {} issue found in the model.",
                    issue_type.name.to_lowercase()
                ),
                comments: vec![IssueComment {
                    user: pick(rng, &USERS),
                    timestamp: commented.to_rfc3339(),
                    message: format!(
                        "Initial assessment completed for this {} issue.",
                        issue_type.severity
                    ),
                }],
            }
        })
        .collect()
}

fn pick<R: RandomSource + ?Sized>(rng: &mut R, items: &[&str]) -> String {
    choose(rng, items).copied().unwrap_or_default().to_string()
}

fn random_id<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&rng.next_u64().to_be_bytes());
    bytes[8..].copy_from_slice(&rng.next_u64().to_be_bytes());
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
