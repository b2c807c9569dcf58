use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const FRAME_INTERVAL: Duration = Duration::from_millis(80);
/// Carriage return plus ANSI erase-line.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Terminal spinner drawn on stderr while a request is in flight.
///
/// Must be started inside a tokio runtime.
pub struct ProgressIndicator {
    message: String,
    running: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
}

impl ProgressIndicator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            running: None,
        }
    }

    /// Create and start in one step.
    pub fn start_new(message: impl Into<String>) -> Self {
        let mut indicator = Self::new(message);
        indicator.start();
        indicator
    }

    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let message = self.message.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            let mut frame_index = 0usize;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        draw(frame(frame_index), &message);
                        frame_index = frame_index.wrapping_add(1);
                    }
                }
            }
        });
        self.running = Some((stop_tx, handle));
    }

    /// Stop the spinner and replace its line with `final_message`
    /// (default `✓ <message>`).
    pub async fn stop(mut self, final_message: Option<&str>) {
        let Some((stop_tx, handle)) = self.running.take() else {
            return;
        };
        let _ = stop_tx.send(());
        let _ = handle.await;

        let line = final_line(&self.message, final_message);
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{CLEAR_LINE}{line}");
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.running.take() {
            handle.abort();
        }
    }
}

/// Held while a frame is drawn or while [`suspend`] runs.
static DRAW_LOCK: Mutex<()> = Mutex::new(());

/// Erase the spinner line and run `f` with no frame drawn in between, so
/// output written by `f` (e.g. a log line) starts at column zero. The next
/// frame redraws the spinner below it.
pub fn suspend<R>(f: impl FnOnce() -> R) -> R {
    let _guard = DRAW_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "{CLEAR_LINE}");
        let _ = err.flush();
    }
    f()
}

fn draw(frame: char, message: &str) {
    let _guard = DRAW_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let mut err = std::io::stderr().lock();
    let _ = write!(err, "{}", frame_line(frame, message));
    let _ = err.flush();
}

fn frame_line(frame: char, message: &str) -> String {
    format!("{CLEAR_LINE}{frame} {message}")
}

fn frame(index: usize) -> char {
    FRAMES[index % FRAMES.len()]
}

fn final_line(message: &str, final_message: Option<&str>) -> String {
    match final_message {
        Some(m) => m.to_string(),
        None => format!("✓ {message}"),
    }
}
