//! Simulated RSSI sampling on a timer

use bevy::prelude::*;
use beamsight_core::SignalMonitor;
use std::time::Duration;
use tracing::{info, warn};

use crate::app::{AppConfig, View};
use crate::file_picker::{FilePickerContext, FilePickerState};

/// Snapshot download name
pub const SNAPSHOT_FILENAME: &str = "beamsight-snapshot.json";

pub struct SignalPlugin;

impl Plugin for SignalPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_signal)
            .add_systems(Update, (sample_signal, log_snapshot_exports));
    }
}

/// The monitor behind the status panel numbers
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct SignalState(pub SignalMonitor);

#[derive(Resource)]
struct SignalTimer(Timer);

fn setup_signal(mut commands: Commands, config: Res<AppConfig>, mut view: ResMut<View>) {
    let signal = &config.signal;
    let monitor = SignalMonitor::new(signal);
    view.set_signal(monitor.baseline(), monitor.baseline());

    commands.insert_resource(SignalState(monitor));
    commands.insert_resource(SignalTimer(Timer::new(
        Duration::from_millis(signal.poll_interval_ms.max(1)),
        TimerMode::Repeating,
    )));
}

/// Take a sample each poll interval and publish it to the view
fn sample_signal(
    time: Res<Time>,
    mut timer: ResMut<SignalTimer>,
    mut state: ResMut<SignalState>,
    mut view: ResMut<View>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }
    let rssi = state.sample(time.elapsed_secs_f64(), view.is_detected());
    let baseline = state.baseline();
    view.set_signal(rssi, baseline);
}

fn log_snapshot_exports(mut picker: ResMut<FilePickerState>) {
    while let Some(result) = picker.take_result_for(&FilePickerContext::SnapshotExport) {
        if result.success {
            info!(filename = %result.filename, "Metrics snapshot exported");
        } else {
            warn!(
                filename = %result.filename,
                operation = ?result.operation,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Metrics snapshot export failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamsight_core::{MarkerKind, MarkerPosition};

    fn signal_app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>()
            .init_resource::<AppConfig>()
            .init_resource::<View>()
            .init_resource::<FilePickerState>()
            .add_plugins(SignalPlugin);
        app.update();
        app
    }

    fn advance(app: &mut App, millis: u64) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(millis));
        app.update();
    }

    #[test]
    fn test_view_starts_at_baseline() {
        let app = signal_app();
        let detection = app.world().resource::<View>().detection().clone();
        assert_eq!(detection.rssi, -45);
        assert_eq!(detection.baseline, -45);
        assert_eq!(app.world().resource::<SignalState>().history_len(), 0);
    }

    #[test]
    fn test_samples_follow_detection() {
        let mut app = signal_app();
        {
            let mut view = app.world_mut().resource_mut::<View>();
            view.select_marker(MarkerKind::Phone);
            view.place_marker(MarkerPosition::new(0.0, 0.0, 0.0));
            view.select_marker(MarkerKind::Laptop);
            view.place_marker(MarkerPosition::new(1.0, 0.0, 0.0));
            view.toggle_detection();
        }

        advance(&mut app, 300);
        let state = app.world().resource::<SignalState>();
        assert_eq!(state.history_len(), 1);
        assert!(state.drop_detected());
        let rssi = app.world().resource::<View>().detection().rssi;
        assert_eq!(Some(rssi), state.latest());
        assert!(rssi <= -45 - 6);
    }
}
