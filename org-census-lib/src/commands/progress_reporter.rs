use crate::facts::Progress;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;

type StatusCallback = Box<dyn Fn() -> (u64, u64, String) + Send + Sync>;

const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const BAR_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:30}] {msg}";
const BAR_TEMPLATE_PLAIN: &str = "{prefix:>12} [{bar:30}] {msg}";
const SPINNER_TEMPLATE: &str = "{prefix:>12.bold.cyan} {spinner} {msg}";
const SPINNER_TEMPLATE_PLAIN: &str = "{prefix:>12} {spinner} {msg}";
const SPINNER_FRAMES: &str = "|/-\\ ";

struct BarState {
    show_at: Instant,
    shown: AtomicBool,
    spinning: AtomicBool,
    phase_started: Mutex<Instant>,
}

impl Debug for BarState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BarState")
            .field("show_at", &self.show_at)
            .field("shown", &self.shown)
            .field("spinning", &self.spinning)
            .finish_non_exhaustive()
    }
}

/// Terminal progress bar for the collection phases.
///
/// Nothing is drawn until `delay` has elapsed, so quick runs (for example, fully
/// cached ones) leave the terminal untouched.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    state: Arc<BarState>,
    status: Arc<Mutex<StatusCallback>>,
    refresher: Arc<JoinHandle<()>>,
    use_colors: bool,
}

impl ProgressReporter {
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());

        let state = Arc::new(BarState {
            show_at: Instant::now() + delay,
            shown: AtomicBool::new(false),
            spinning: AtomicBool::new(false),
            phase_started: Mutex::new(Instant::now()),
        });

        let status: Arc<Mutex<StatusCallback>> = Arc::new(Mutex::new(Box::new(|| (0, 0, String::new()))));
        let refresher = tokio::spawn(refresh(bar.clone(), Arc::clone(&state), Arc::clone(&status)));

        Self {
            bar,
            state,
            status,
            refresher: Arc::new(refresher),
            use_colors,
        }
    }

    fn style(&self, colored: &str, plain: &str, spinner: bool) -> ProgressStyle {
        let template = if self.use_colors { colored } else { plain };
        let base = if spinner {
            ProgressStyle::default_spinner().tick_chars(SPINNER_FRAMES)
        } else {
            ProgressStyle::default_bar().progress_chars("=> ")
        };

        base.template(template).expect("progress templates are static and valid")
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
        *self.state.phase_started.lock().expect("lock poisoned") = Instant::now();
    }

    fn set_determinate(&self, callback: Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>) {
        *self.status.lock().expect("lock poisoned") = callback;
        self.state.spinning.store(false, Ordering::Relaxed);
        self.bar.disable_steady_tick();
        self.bar.set_length(0);
        self.bar.set_position(0);
        self.bar.set_style(self.style(BAR_TEMPLATE, BAR_TEMPLATE_PLAIN, false));
    }

    fn set_indeterminate(&self, callback: Box<dyn Fn() -> String + Send + Sync + 'static>) {
        *self.status.lock().expect("lock poisoned") = Box::new(move || (0, 0, callback()));
        *self.state.phase_started.lock().expect("lock poisoned") = Instant::now();
        self.state.spinning.store(true, Ordering::Relaxed);
        self.bar.enable_steady_tick(REFRESH_INTERVAL);
        self.bar.set_style(self.style(SPINNER_TEMPLATE, SPINNER_TEMPLATE_PLAIN, true));
    }

    fn done(&self) {
        self.refresher.abort();
        if self.state.shown.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }

    fn use_colors(&self) -> bool {
        self.use_colors
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("state", &self.state)
            .field("use_colors", &self.use_colors)
            .finish_non_exhaustive()
    }
}

async fn refresh(bar: ProgressBar, state: Arc<BarState>, status: Arc<Mutex<StatusCallback>>) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !state.shown.load(Ordering::Relaxed) {
            if Instant::now() < state.show_at {
                continue;
            }
            state.shown.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        let (length, position, mut message) = (status.lock().expect("lock poisoned"))();

        if state.spinning.load(Ordering::Relaxed) {
            let elapsed = state.phase_started.lock().expect("lock poisoned").elapsed().as_secs();
            message = format!("{elapsed}s: {message}");
        }

        if length > 0 {
            bar.set_length(length);
            bar.set_position(position);
        }
        bar.set_message(message);
    }
}
