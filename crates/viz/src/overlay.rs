//! UI overlays: line status HUD and the failure log.

use bevy::prelude::*;

use twin_sync::FrameView;

use crate::frame::{CurrentFrame, FrameSet};
use crate::runner::RunStatus;

/// Plugin for UI overlay rendering.
pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_overlay)
            .add_systems(Update, (update_hud_text, update_failure_text).after(FrameSet));
    }
}

/// Keyboard help shown at the bottom of the HUD.
pub const KEY_HINTS: &str = "[S] start/stop  [R] reset  [P] poll  [arrows] pan  [=/-] zoom  [Home] recentre";

/// Component for the status text.
#[derive(Component)]
pub struct HudText;

/// Component for the failure log text.
#[derive(Component)]
pub struct FailureLogText;

/// Lines of the status HUD.
pub fn hud_lines(view: &FrameView, status: &RunStatus) -> Vec<String> {
    let mut lines = Vec::new();

    match status {
        RunStatus::Failed(error) => lines.push(format!("Status: failed ({})", error)),
        _ => lines.push(format!("Status: {}", status.label())),
    }

    match &view.totals {
        Some(totals) => {
            lines.push(format!("t = {:.2}   alpha = {:.2}", totals.t_end, view.alpha));
            lines.push(format!(
                "Throughput: {}   WIP: {}",
                totals.throughput, totals.wip
            ));
            lines.push(format!(
                "Blocked: {}   Starved: {}   Down: {}",
                totals.blocked, totals.starved, totals.down
            ));
            lines.push(format!(
                "Workers: {}/{} available",
                totals.workers_available, totals.workers_total
            ));
        }
        None => lines.push("Waiting for first snapshot...".to_string()),
    }

    if let Some(summary) = &view.summary {
        lines.push(format!(
            "Jobs: {}/{}   makespan {:.1}   avg WIP {:.2}   util {:.0}%",
            summary.jobs_completed,
            summary.total_jobs,
            summary.makespan,
            summary.avg_wip,
            summary.avg_util * 100.0
        ));
    }

    lines.push(KEY_HINTS.to_string());
    lines
}

/// Failure log entries, newest first.
pub fn failure_lines(view: &FrameView) -> Vec<String> {
    view.failures
        .iter()
        .rev()
        .map(|f| format!("t={:>8.2}  station {} down", f.time, f.station))
        .collect()
}

/// System to set up the HUD and failure log panels.
fn setup_overlay(mut commands: Commands) {
    // Status panel (top-left)
    commands
        .spawn(NodeBundle {
            style: Style {
                position_type: PositionType::Absolute,
                top: Val::Px(10.0),
                left: Val::Px(10.0),
                padding: UiRect::all(Val::Px(10.0)),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            background_color: Color::srgba(0.0, 0.0, 0.0, 0.7).into(),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                TextBundle::from_section(
                    "",
                    TextStyle {
                        font_size: 14.0,
                        color: Color::srgb(0.9, 0.9, 0.9),
                        ..default()
                    },
                ),
                HudText,
            ));
        });

    // Failure log (top-right)
    commands
        .spawn(NodeBundle {
            style: Style {
                position_type: PositionType::Absolute,
                top: Val::Px(10.0),
                right: Val::Px(10.0),
                padding: UiRect::all(Val::Px(10.0)),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            background_color: Color::srgba(0.0, 0.0, 0.0, 0.7).into(),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn(TextBundle::from_section(
                "FAILURES",
                TextStyle {
                    font_size: 14.0,
                    color: Color::srgb(0.95, 0.4, 0.35),
                    ..default()
                },
            ));
            parent.spawn((
                TextBundle::from_section(
                    "",
                    TextStyle {
                        font_size: 12.0,
                        color: Color::srgb(0.85, 0.85, 0.85),
                        ..default()
                    },
                ),
                FailureLogText,
            ));
        });
}

fn update_hud_text(
    frame: Res<CurrentFrame>,
    status: Res<RunStatus>,
    mut query: Query<&mut Text, With<HudText>>,
) {
    let content = hud_lines(&frame.view, &status).join("\n");
    for mut text in query.iter_mut() {
        text.sections[0].value.clone_from(&content);
    }
}

fn update_failure_text(frame: Res<CurrentFrame>, mut query: Query<&mut Text, With<FailureLogText>>) {
    let lines = failure_lines(&frame.view);
    let content = if lines.is_empty() {
        "none".to_string()
    } else {
        lines.join("\n")
    };
    for mut text in query.iter_mut() {
        text.sections[0].value.clone_from(&content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_events::Summary;
    use twin_sync::{FailureEvent, LineTotals};

    fn view_with_totals() -> FrameView {
        FrameView {
            alpha: 0.25,
            totals: Some(LineTotals {
                t_end: 12.5,
                throughput: 7,
                wip: 3,
                blocked: 1,
                starved: 0,
                down: 1,
                workers_available: 1,
                workers_total: 2,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_hud_before_first_snapshot() {
        let lines = hud_lines(&FrameView::default(), &RunStatus::Idle);
        assert_eq!(lines[0], "Status: idle");
        assert_eq!(lines[1], "Waiting for first snapshot...");
        assert_eq!(lines.last().map(String::as_str), Some(KEY_HINTS));
    }

    #[test]
    fn test_hud_shows_totals() {
        let lines = hud_lines(&view_with_totals(), &RunStatus::Running);
        assert_eq!(lines[0], "Status: running");
        assert_eq!(lines[1], "t = 12.50   alpha = 0.25");
        assert_eq!(lines[2], "Throughput: 7   WIP: 3");
        assert_eq!(lines[4], "Workers: 1/2 available");
    }

    #[test]
    fn test_hud_shows_error_and_summary() {
        let mut view = view_with_totals();
        view.summary = Some(Summary {
            total_jobs: 20,
            jobs_completed: 20,
            makespan: 88.0,
            avg_wip: 2.5,
            avg_util: 0.5,
            ..Default::default()
        });
        let lines = hud_lines(&view, &RunStatus::Failed("step returned 500".into()));
        assert_eq!(lines[0], "Status: failed (step returned 500)");
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Jobs: 20/20") && l.contains("util 50%")));
    }

    #[test]
    fn test_failure_lines_newest_first() {
        let view = FrameView {
            failures: vec![
                FailureEvent { time: 1.0, station: 0 },
                FailureEvent { time: 4.0, station: 2 },
            ],
            ..Default::default()
        };
        let lines = failure_lines(&view);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("station 2"));
        assert!(lines[1].contains("station 0"));
    }
}
