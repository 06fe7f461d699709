use std::sync::Arc;
use std::time::Duration;

use ember::prelude::*;

mod demo;
use demo::{DemoLogic, EchoPlatform, LoggingRasterizer};

const DEFAULT_FRAMES: usize = 30;

fn main() {
    let settings = load_or_default().unwrap_or_else(|err| {
        eprintln!("ember settings failed to load: {}", err);
        std::process::exit(1);
    });
    init_logger_with_filter(&settings.log_filter);

    let frames = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .unwrap_or(DEFAULT_FRAMES);

    if let Err(err) = run(&settings, frames) {
        eprintln!("ember shell failed: {}", err);
        std::process::exit(1);
    }
}

fn run(settings: &EngineSettings, frames: usize) -> Result<(), RuntimeError> {
    let (event_tx, event_rx) = event_channel();
    let shell = Shell::new(
        settings,
        ShellParts {
            rasterizer: Arc::new(LoggingRasterizer),
            platform: Arc::new(EchoPlatform),
            events: Some(event_tx),
            ..ShellParts::default()
        },
    )?;

    shell.set_viewport_metrics(ViewportMetrics::with_size(640.0, 480.0));
    shell.set_locale(Locale {
        language_code: "en".to_string(),
        country_code: "US".to_string(),
    });
    shell.run_logic(DemoLogic::new(frames));

    let source = shell.event_source();
    for event in [
        PlatformEvent::CursorMoved { x: 10.0, y: 10.0 },
        PlatformEvent::MouseButton {
            button: 0,
            action: ButtonAction::Press,
        },
        PlatformEvent::CursorMoved { x: 40.0, y: 12.0 },
        PlatformEvent::MouseButton {
            button: 0,
            action: ButtonAction::Release,
        },
    ] {
        source.try_push(event);
    }

    shell.dispatch_platform_message(PlatformMessage::new(
        "ember/lifecycle",
        b"resumed".to_vec(),
        Some(CallbackResponse::new(|reply| {
            info!("lifecycle acknowledged: {:?}", reply.map(|r| r.len()));
        })),
    ));

    let deadline = Duration::from_secs(10);
    let target = frames.max(1) as u64;
    loop {
        match event_rx.recv_timeout(deadline) {
            Ok(EngineEvent::FrameRasterized(n)) if n >= target => break,
            Ok(event) => trace!("{:?}", event),
            Err(_) => {
                warn!("timed out waiting for frame {}", target);
                break;
            }
        }
    }

    if let Some(fps) =
        shell.with_engine(|engine| engine.animator().average_fps())
    {
        info!("average fps: {:.1}", fps);
    }

    shell.shutdown();
    Ok(())
}
