use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDirection {
    Increase,
    Decrease,
    Maintain,
}

impl TargetDirection {
    pub fn parse(value: &str) -> Self {
        match value {
            "decrease" => TargetDirection::Decrease,
            "maintain" => TargetDirection::Maintain,
            _ => TargetDirection::Increase,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetDirection::Increase => "increase",
            TargetDirection::Decrease => "decrease",
            TargetDirection::Maintain => "maintain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    Pending,
    InProgress,
    Completed,
}

impl ObjectiveStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => ObjectiveStatus::Pending,
            "completed" => ObjectiveStatus::Completed,
            _ => ObjectiveStatus::InProgress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveStatus::Pending => "pending",
            ObjectiveStatus::InProgress => "in_progress",
            ObjectiveStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    OnTrack,
    AtRisk,
    OffTrack,
    Completed,
    Exceeded,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::OnTrack => "on_track",
            HealthStatus::AtRisk => "at_risk",
            HealthStatus::OffTrack => "off_track",
            HealthStatus::Completed => "completed",
            HealthStatus::Exceeded => "exceeded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectiveRecord {
    pub id: Uuid,
    pub name: String,
    pub restaurant: String,
    pub kpi_name: String,
    pub kpi_unit: String,
    pub baseline_value: Option<f64>,
    pub target_value: Option<f64>,
    pub direction: TargetDirection,
    pub baseline_date: NaiveDate,
    pub evaluation_date: Option<NaiveDate>,
    pub status: ObjectiveStatus,
}

#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub objective_id: Uuid,
    pub kpi_value: f64,
    pub snapshot_date: NaiveDate,
}

/// One objective's computed grade. Built fresh on every invocation of the
/// engine and never persisted; identical inputs produce identical output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveProgressData {
    pub current_value: Option<f64>,
    pub progress_percentage: Option<f64>,
    pub expected_progress: Option<f64>,
    pub health_status: HealthStatus,
    pub velocity: Option<f64>,
    pub projected_value: Option<f64>,
    pub will_complete: bool,
    pub trend: Trend,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub total_days: i64,
    pub is_loading: bool,
}
