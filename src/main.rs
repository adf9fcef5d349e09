use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use drivelog::config::Config;
use drivelog::logging::{ChannelHandle, Level, LoggingManager, SpecialCategory};
use drivelog::overlay::{LogOverlay, OverlayHandle, OverlayState, TerminalCanvas};
use ratatui::backend::CrosstermBackend;

type Overlay = LogOverlay<TerminalCanvas<CrosstermBackend<std::io::Stdout>>>;

/// Frame interval of the overlay loop
const TICK: Duration = Duration::from_millis(50);

/// What the key loop asks the main loop to do next
enum Action {
    Continue,
    Quit,
}

/// Simulated vehicle subsystem feeding one special channel
struct Producer {
    name: &'static str,
    category: SpecialCategory,
    overlay_category: &'static str,
    period: Duration,
    /// Maximum records per second reaching the channel
    rate_limit: f64,
    describe: fn(u64) -> (Level, String),
}

static PRODUCERS: [Producer; 3] = [
    Producer {
        name: "sensor-worker",
        category: SpecialCategory::Sensor,
        overlay_category: "sensors",
        period: Duration::from_millis(20),
        rate_limit: 4.0,
        describe: describe_sensor,
    },
    Producer {
        name: "control-worker",
        category: SpecialCategory::Control,
        overlay_category: "control",
        period: Duration::from_millis(50),
        rate_limit: 2.0,
        describe: describe_control,
    },
    Producer {
        name: "sync-worker",
        category: SpecialCategory::Sync,
        overlay_category: "sync",
        period: Duration::from_millis(100),
        rate_limit: 1.0,
        describe: describe_sync,
    },
];

fn describe_sensor(tick: u64) -> (Level, String) {
    let points = 118_000 + (tick * 7_919) % 4_000;
    if tick % 97 == 0 {
        (Level::Warning, format!("LiDAR frame {} dropped {} points", tick, points % 500))
    } else {
        (Level::Debug, format!("LiDAR frame {}: {} points", tick, points))
    }
}

fn describe_control(tick: u64) -> (Level, String) {
    let steering = ((tick % 40) as f64 - 20.0) / 100.0;
    let throttle = (tick % 10) as f64 / 20.0;
    (
        Level::Info,
        format!("steering {:+.2} rad, throttle {:.2}", steering, throttle),
    )
}

fn describe_sync(tick: u64) -> (Level, String) {
    let offset_us = (tick * 37) % 250;
    let level = if offset_us > 200 { Level::Warning } else { Level::Info };
    (level, format!("camera/LiDAR clock offset {} us", offset_us))
}

fn spawn_producer(
    producer: &'static Producer,
    manager: Arc<LoggingManager>,
    overlay: OverlayHandle,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let channel: ChannelHandle = manager
        .special_logger(producer.category)
        .context("special channel missing")?;

    thread::Builder::new()
        .name(producer.name.to_string())
        .spawn(move || {
            let mut tick = 0u64;
            while running.load(Ordering::Relaxed) {
                let (level, message) = (producer.describe)(tick);
                if manager.rate_limited_log(&channel, level, message.clone(), producer.rate_limit) {
                    overlay.add_log(producer.overlay_category, &message);
                }
                tick += 1;
                thread::sleep(producer.period);
            }
        })
        .with_context(|| format!("Failed to spawn {}", producer.name))
}

/// Special-channel toggles bound to keys 1-5
struct Toggles {
    enabled: [bool; 5],
}

impl Toggles {
    fn flip(&mut self, manager: &LoggingManager, overlay: &OverlayHandle, index: usize) {
        let Some(category) = SpecialCategory::ALL.get(index) else {
            return;
        };
        self.enabled[index] = !self.enabled[index];
        let enable = self.enabled[index];
        manager.toggle_special_logger(category.as_str(), enable);
        overlay.add_log(
            "system",
            &format!("{} {} logging", if enable { "Enabled" } else { "Disabled" }, category),
        );
    }
}

async fn handle_key(
    key: KeyEvent,
    manager: &Arc<LoggingManager>,
    overlay: &mut Overlay,
    toggles: &mut Toggles,
) -> Action {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => return Action::Quit,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => return Action::Quit,
        (KeyCode::Char(digit @ '1'..='5'), _) => {
            let index = digit as usize - '1' as usize;
            toggles.flip(manager, &overlay.handle(), index);
        }
        (KeyCode::Char('f'), _) => {
            let manager = Arc::clone(manager);
            // Samples CPU for a short while
            match tokio::task::spawn_blocking(move || manager.log_system_info()).await {
                Ok(()) => overlay.add_log("system", "System info written to system channel"),
                Err(e) => tracing::warn!("System info task failed: {}", e),
            }
        }
        (KeyCode::Char('c'), _) => overlay.clear(),
        _ => overlay.process_key(key),
    }
    Action::Continue
}

/// Handle every pending terminal event without blocking
async fn drain_events(
    manager: &Arc<LoggingManager>,
    overlay: &mut Overlay,
    toggles: &mut Toggles,
) -> Result<Action> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Action::Quit = handle_key(key, manager, overlay, toggles).await {
                return Ok(Action::Quit);
            }
        }
    }
    Ok(Action::Continue)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    let mut logging = config.logging.clone();
    // The overlay owns the terminal
    logging.enable_console = false;
    let manager = LoggingManager::get_or_initialize(logging)?;

    tracing::info!("drivelog demo starting, logs in {}", manager.log_dir().display());

    let mut overlay = LogOverlay::open(config.overlay.clone(), TerminalCanvas::stdout);
    if overlay.state() == OverlayState::Uninitialized {
        manager.flush_all();
        anyhow::bail!("No terminal available for the log overlay");
    }

    let running = Arc::new(AtomicBool::new(true));
    let mut workers = Vec::new();
    for producer in &PRODUCERS {
        workers.push(spawn_producer(
            producer,
            Arc::clone(&manager),
            overlay.handle(),
            Arc::clone(&running),
        )?);
    }

    overlay.add_log("system", "Keys: 1-5 toggle channels, f system info, c clear, q quit");
    let mut toggles = Toggles { enabled: [true; 5] };
    let mut interval = tokio::time::interval(TICK);

    let result = loop {
        interval.tick().await;
        overlay.render();

        match drain_events(&manager, &mut overlay, &mut toggles).await {
            Ok(Action::Continue) => {}
            Ok(Action::Quit) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    running.store(false, Ordering::Relaxed);
    for worker in workers {
        if worker.join().is_err() {
            tracing::warn!("A producer thread panicked");
        }
    }

    if let Some(canvas) = overlay.into_canvas() {
        canvas.close()?;
    }
    tracing::info!("drivelog demo stopped");
    manager.flush_all();
    result
}
