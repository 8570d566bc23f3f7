use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{HealthStatus, ObjectiveProgressData, ObjectiveRecord};

pub fn health_mix(graded: &[(ObjectiveRecord, ObjectiveProgressData)]) -> Vec<(HealthStatus, usize)> {
    let order = [
        HealthStatus::Exceeded,
        HealthStatus::Completed,
        HealthStatus::OnTrack,
        HealthStatus::AtRisk,
        HealthStatus::OffTrack,
    ];

    order
        .into_iter()
        .map(|status| {
            let count = graded
                .iter()
                .filter(|(_, data)| !data.is_loading && data.health_status == status)
                .count();
            (status, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}

fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}%"),
        None => "n/a".to_string(),
    }
}

fn fmt_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if unit.is_empty() => format!("{v:.2}"),
        Some(v) => format!("{v:.2} {unit}"),
        None => "n/a".to_string(),
    }
}

pub fn build_report(
    restaurant: Option<&str>,
    on_date: NaiveDate,
    graded: &[(ObjectiveRecord, ObjectiveProgressData)],
) -> String {
    let mut output = String::new();
    let scope_label = restaurant.unwrap_or("all restaurants");

    let _ = writeln!(output, "# Objective Progress Report");
    let _ = writeln!(output, "Generated for {} as of {}", scope_label, on_date);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Portfolio Health");

    let mix = health_mix(graded);
    if mix.is_empty() {
        let _ = writeln!(output, "No gradable objectives in scope.");
    } else {
        for (status, count) in mix {
            let _ = writeln!(output, "- {}: {} objectives", status.as_str(), count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Objectives");

    if graded.is_empty() {
        let _ = writeln!(output, "No objectives in scope.");
    } else {
        for (objective, data) in graded {
            if data.is_loading {
                let _ = writeln!(
                    output,
                    "- {} ({}): awaiting KPI data ({} days elapsed, {} remaining)",
                    objective.name, objective.restaurant, data.days_elapsed, data.days_remaining
                );
                continue;
            }
            let _ = writeln!(
                output,
                "- {} ({}): {} at {} progress, trend {}, current {}, projected {}",
                objective.name,
                objective.restaurant,
                data.health_status.as_str(),
                fmt_pct(data.progress_percentage),
                data.trend.as_str(),
                fmt_value(data.current_value, &objective.kpi_unit),
                fmt_value(data.projected_value, &objective.kpi_unit),
            );
        }
    }

    let attention: Vec<&(ObjectiveRecord, ObjectiveProgressData)> = graded
        .iter()
        .filter(|(_, data)| {
            !data.is_loading
                && matches!(
                    data.health_status,
                    HealthStatus::AtRisk | HealthStatus::OffTrack
                )
        })
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if attention.is_empty() {
        let _ = writeln!(output, "Nothing behind schedule in this window.");
    } else {
        for (objective, data) in attention {
            let velocity = match data.velocity {
                Some(v) => format!("{v:.2} {}/day", objective.kpi_unit),
                None => "not enough snapshots for a velocity".to_string(),
            };
            let closer = if data.will_complete {
                "projected to land on target"
            } else {
                "not projected to reach target by the deadline"
            };
            let _ = writeln!(
                output,
                "- {} ({}): {} vs {} expected, {}, {} days left, {}",
                objective.name,
                objective.restaurant,
                fmt_pct(data.progress_percentage),
                fmt_pct(data.expected_progress),
                velocity,
                data.days_remaining,
                closer
            );
        }
    }

    output
}
