mod common;

use std::{fs, sync::mpsc, sync::Mutex, thread};

use common::*;
use olive_classifier::{
    acquire::{FileAcquirer, ImageSource},
    screen::{Notice, ScreenController, ScreenState, Transition},
    service::{labels::LabelTable, Config, Service},
};

fn service(engine: ScriptedEngine) -> Service<ScriptedEngine> {
    Service::new(engine, LabelTable::default(), Config::default()).unwrap()
}

fn write_png(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, png_bytes(64, 48)).unwrap();
    path
}

#[test]
fn idle_loading_result_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(ScriptedEngine::new(
        Behavior::Accept(CHANNELS_FIRST.to_vec()),
        &ANTHRACNOSE_SCORES,
    ));
    let controller = ScreenController::new(FileAcquirer::new([write_png(&dir, "leaf.png")]), &service);
    assert_eq!(controller.state(), ScreenState::Idle);

    let Transition::Completed(verdict) = controller.acquire(ImageSource::Gallery) else {
        panic!("the run should complete");
    };
    assert_eq!(verdict.disease_label.as_deref(), Some("Anthracnose"));
    assert_eq!(controller.state(), ScreenState::Result(verdict));

    // a result is on screen, the user has to reset first
    assert_eq!(controller.acquire(ImageSource::Camera), Transition::Ignored);

    assert_eq!(controller.reset(), Transition::Reset);
    assert_eq!(controller.state(), ScreenState::Idle);
    assert_eq!(controller.reset(), Transition::Ignored);
    assert!(controller.take_notices().is_empty());
}

#[test]
fn permission_denied_goes_back_to_idle_with_a_notice() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(ScriptedEngine::new(
        Behavior::Accept(CHANNELS_FIRST.to_vec()),
        &HEALTHY_SCORES,
    ));
    let acquirer = FileAcquirer::new([write_png(&dir, "leaf.png")]).deny(ImageSource::Camera);
    let controller = ScreenController::new(acquirer, &service);

    let transition = controller.acquire(ImageSource::Camera);
    assert_eq!(
        transition,
        Transition::Failed(Notice::PermissionNeeded(String::from(
            "Please grant camera access"
        )))
    );
    assert_eq!(controller.state(), ScreenState::Idle);
    assert_eq!(controller.take_notices().len(), 1);
    assert!(controller.take_notices().is_empty());

    // the gallery is still allowed
    assert!(matches!(
        controller.acquire(ImageSource::Gallery),
        Transition::Completed(_)
    ));
}

#[test]
fn cancelled_picker_is_silent() {
    let service = service(ScriptedEngine::new(
        Behavior::Accept(CHANNELS_FIRST.to_vec()),
        &HEALTHY_SCORES,
    ));
    let controller = ScreenController::new(FileAcquirer::default(), &service);

    assert_eq!(controller.acquire(ImageSource::Gallery), Transition::Cancelled);
    assert_eq!(controller.state(), ScreenState::Idle);
    assert!(controller.take_notices().is_empty());
}

#[test]
fn analysis_failure_is_notified() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.jpg");
    fs::write(&broken, b"\xFF\xD8\xFF\xE0 truncated").unwrap();

    let service = service(ScriptedEngine::new(
        Behavior::Accept(CHANNELS_FIRST.to_vec()),
        &HEALTHY_SCORES,
    ));
    let controller = ScreenController::new(FileAcquirer::new([broken]), &service);

    let Transition::Failed(Notice::AnalysisFailed(message)) =
        controller.acquire(ImageSource::Gallery)
    else {
        panic!("the run should fail");
    };
    assert!(message.starts_with("Failed to analyze image"));
    assert_eq!(controller.state(), ScreenState::Idle);
    assert_eq!(
        controller.take_notices(),
        vec![Notice::AnalysisFailed(message)]
    );
}

#[test]
fn label_mismatch_is_notified_too() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(ScriptedEngine::new(
        Behavior::Accept(CHANNELS_FIRST.to_vec()),
        &[0.5, 0.5],
    ));
    let controller = ScreenController::new(FileAcquirer::new([write_png(&dir, "leaf.png")]), &service);

    assert!(matches!(
        controller.acquire(ImageSource::Gallery),
        Transition::Failed(Notice::AnalysisFailed(_))
    ));
    assert_eq!(controller.state(), ScreenState::Idle);
}

#[test]
fn second_acquisition_while_loading_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let engine = ScriptedEngine::new(Behavior::Accept(CHANNELS_FIRST.to_vec()), &HEALTHY_SCORES)
        .with_gate(Gate {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
    let service = service(engine);
    let acquirer = FileAcquirer::new([write_png(&dir, "first.png"), write_png(&dir, "second.png")]);
    let controller = ScreenController::new(&acquirer, &service);

    thread::scope(|scope| {
        let first = scope.spawn(|| controller.acquire(ImageSource::Camera));

        // the first run is now blocked inside the engine
        entered_rx.recv().unwrap();
        assert!(controller.is_busy());
        assert_eq!(controller.state(), ScreenState::Loading);
        assert_eq!(controller.acquire(ImageSource::Gallery), Transition::Ignored);
        assert_eq!(controller.reset(), Transition::Ignored);

        release_tx.send(()).unwrap();
        assert!(matches!(first.join().unwrap(), Transition::Completed(_)));
    });

    assert!(!controller.is_busy());
    drop(controller);
    // the ignored request did not consume the queued image
    assert_eq!(acquirer.remaining(), 1);
    let engine = service.into_engine();
    assert_eq!(engine.calls().len(), 1);
}
