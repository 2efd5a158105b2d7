use crate::Coordinate;
use crate::map_canvas::MapCanvas;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const ANIMATION_STEPS: u32 = 100;
pub const ANIMATION_TICK: Duration = Duration::from_millis(30);

/// Position on the straight segment after `step` of `steps`. Uses the
/// fraction form so step == steps lands exactly on the end coordinate.
pub fn interpolate(start: Coordinate, end: Coordinate, step: u32, steps: u32) -> Coordinate {
    let t = step as f64 / steps as f64;

    Coordinate::new(
        start.lat + (end.lat - start.lat) * t,
        start.lon + (end.lon - start.lon) * t,
    )
}

/// Drives the moving marker from start to end in a fixed number of timer
/// steps. The duration is the same for every route regardless of its length.
///
/// Owns the single timer task: starting a new route aborts the previous one,
/// so a stale closure can never keep relocating the freshly placed marker.
pub struct RouteAnimator {
    steps: u32,
    tick: Duration,
    task: Option<JoinHandle<()>>,
}

impl RouteAnimator {
    pub fn new() -> RouteAnimator {
        RouteAnimator::with_tick(ANIMATION_TICK)
    }

    pub fn with_tick(tick: Duration) -> RouteAnimator {
        RouteAnimator {
            steps: ANIMATION_STEPS,
            tick,
            task: None,
        }
    }

    pub fn start(
        &mut self,
        canvas: Arc<Mutex<MapCanvas>>,
        start: Coordinate,
        end: Coordinate,
    ) {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        {
            let mut canvas = canvas.lock().unwrap();
            canvas.set_route_line(start, end);
            canvas.place_moving_marker(start);
        }

        let steps = self.steps;
        let tick = self.tick;

        self.task = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(tick);

            for step in 0..=steps {
                timer.tick().await;

                let position = interpolate(start, end, step, steps);
                canvas.lock().unwrap().move_moving_marker(position);
            }
        }));
    }

    pub fn is_running(&self) -> bool {
        match &self.task {
            Some(task) => !task.is_finished(),
            None => false,
        }
    }

    /// Waits for the current animation to finish. An aborted run surfaces as
    /// a join error, which is dropped.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
