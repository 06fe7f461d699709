mod support;

use std::sync::Arc;
use std::time::Instant;

use ember::prelude::*;
use support::{Observed, RecordingLogic, RecordingRasterizer};

fn display_shell(
    prefix: &str,
    rasterizer: Arc<RecordingRasterizer>,
    events: Option<EngineEventSender>,
) -> (Shell, VsyncPulse) {
    let (waiter, pulse) =
        DisplayVsyncWaiter::new(60.0).expect("display waiter");
    let shell = support::shell(
        prefix,
        ShellParts {
            rasterizer: rasterizer.clone(),
            waiter: Some(Arc::new(waiter)),
            events,
            ..ShellParts::default()
        },
    );
    *rasterizer.runners.lock() = Some(shell.runners().clone());
    (shell, pulse)
}

#[test]
fn repeated_schedule_frame_coalesces_into_one_begin_frame() {
    let journal = support::journal();
    let rasterizer = Arc::new(RecordingRasterizer::default());
    let (event_tx, event_rx) = event_channel();
    let (shell, pulse) =
        display_shell("coalesce", rasterizer, Some(event_tx));

    shell.run_logic(RecordingLogic::new(&journal).on_create(|scope| {
        for _ in 0..5 {
            scope.schedule_frame();
        }
    }));
    support::settle(&shell);

    assert_eq!(pulse.pulse(Instant::now()), 1);
    support::settle(&shell);
    assert_eq!(pulse.pulse(Instant::now()), 0);
    support::settle(&shell);

    assert_eq!(support::count(&journal, &Observed::Frame), 1);

    shell.shutdown();
    let events = event_rx.try_iter().collect::<Vec<_>>();
    assert_eq!(
        events
            .iter()
            .filter(|event| **event == EngineEvent::FrameScheduled)
            .count(),
        1
    );
    assert!(events.contains(&EngineEvent::FrameBegun(1)));
}

#[test]
fn scheduling_from_begin_frame_waits_for_the_next_vsync() {
    let journal = support::journal();
    let rasterizer = Arc::new(RecordingRasterizer::default());
    let (shell, pulse) = display_shell("chain", rasterizer, None);

    shell.run_logic(
        RecordingLogic::new(&journal)
            .on_create(|scope| scope.schedule_frame())
            .on_frame(|scope| scope.schedule_frame()),
    );
    support::settle(&shell);

    for expected in 1..=3 {
        assert_eq!(pulse.pulse(Instant::now()), 1);
        support::settle(&shell);
        assert_eq!(support::count(&journal, &Observed::Frame), expected);
    }
}

#[test]
fn rendered_scenes_reach_the_rasterizer_on_gpu() {
    let journal = support::journal();
    let rasterizer = Arc::new(RecordingRasterizer::default());
    let (event_tx, event_rx) = event_channel();
    let (shell, pulse) =
        display_shell("raster", rasterizer.clone(), Some(event_tx));

    shell.run_logic(
        RecordingLogic::new(&journal)
            .on_create(|scope| scope.schedule_frame())
            .on_frame(|scope| {
                let scene = Scene::builder()
                    .clear([0.0, 0.0, 0.0, 1.0])
                    .rect([0.0, 0.0, 10.0, 10.0], [1.0, 0.0, 0.0, 1.0])
                    .build();
                scope.render(scene);
            }),
    );
    support::settle(&shell);
    pulse.pulse(Instant::now());
    support::settle(&shell);

    assert_eq!(
        *rasterizer.frames.lock(),
        vec![(1, Some(ExecutionContext::Gpu))]
    );

    shell.shutdown();
    assert!(
        event_rx
            .try_iter()
            .any(|event| event == EngineEvent::FrameRasterized(1))
    );
}

#[test]
fn clock_fallback_drives_frames_without_a_display() {
    let journal = support::journal();
    let (event_tx, event_rx) = event_channel();
    let settings = EngineSettings {
        refresh_rate: 240.0,
        ..support::settings("clock")
    };
    let shell = Shell::new(
        &settings,
        ShellParts {
            events: Some(event_tx),
            ..ShellParts::default()
        },
    )
    .expect("start shell");

    shell.run_logic(
        RecordingLogic::new(&journal).on_create(|scope| scope.schedule_frame()),
    );

    loop {
        match event_rx.recv_timeout(support::TIMEOUT) {
            Ok(EngineEvent::FrameBegun(1)) => break,
            Ok(_) => continue,
            Err(err) => panic!("no frame from the clock waiter: {}", err),
        }
    }
    shell.flush(ExecutionContext::Ui);
    assert_eq!(support::count(&journal, &Observed::Frame), 1);
}

#[test]
fn frames_without_an_isolate_still_advance_the_counter() {
    let rasterizer = Arc::new(RecordingRasterizer::default());
    let (shell, pulse) = display_shell("no-isolate", rasterizer, None);

    let frame_number = shell
        .with_engine(|engine| {
            engine.animator().request_frame();
            engine.animator().frame_number()
        })
        .expect("engine");
    assert_eq!(frame_number, 0);

    assert_eq!(pulse.pulse(Instant::now()), 1);
    support::settle(&shell);
    let frame_number = shell
        .with_engine(|engine| engine.animator().frame_number())
        .expect("engine");
    assert_eq!(frame_number, 1);
}
