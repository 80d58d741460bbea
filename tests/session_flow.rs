
use std::sync::atomic::Ordering;

use gesture_canvas::{
    Lifecycle,
    error::{SessionError, StreamError},
    prompts,
    session::{GestureOutcome, ModelStatus, ResultKind},
    stream::ChannelMessage,
};
use test_helpers::{controller_with, detecting_controller, ready_controller};

#[test]
fn model_load_updates_detector_status() {
    let (mut controller, _) = controller_with(Ok(()));
    assert_eq!(controller.state().detector_status(), "Loading model...");
    controller.tick();
    assert_eq!(controller.state().model_status(), ModelStatus::Ready);
    assert_eq!(
        controller.state().detector_status(),
        "Model loaded - Click Start Detection"
    );
}

#[test]
fn every_known_gesture_requests_its_prompt() {
    for gesture in prompts::known_gestures() {
        let (mut controller, recorder) = detecting_controller();
        recorder.show(gesture);
        controller.tick();

        let expected = prompts::prompt_for(gesture).unwrap();
        assert_eq!(recorder.prompts(), vec![expected.to_string()], "{gesture}");
        assert_eq!(controller.state().lifecycle(), Lifecycle::Generating);
        assert_eq!(controller.state().status(), "Initializing connection...");
        assert!(!controller.camera_active(), "camera kept running for {gesture}");
    }
}

#[test]
fn gesture_without_prompt_keeps_detecting() {
    let (mut controller, recorder) = detecting_controller();
    recorder.show("ILoveYou");
    controller.tick();

    assert!(recorder.prompts().is_empty());
    assert_eq!(controller.state().lifecycle(), Lifecycle::Detecting);
    let banner = controller.state().result().unwrap();
    assert_eq!(banner.kind, ResultKind::Error);
    assert_eq!(banner.text, "No prompt defined for ILoveYou");
    assert_eq!(controller.state().detector_status(), "Detected: ILoveYou");
    assert_eq!(
        controller.state().status(),
        "Detection active - Show your gesture"
    );
}

#[test]
fn progress_is_shown_with_percentage() {
    let (mut controller, recorder) = detecting_controller();
    recorder.show("Thumb_Up");
    controller.tick();

    recorder.send(ChannelMessage::Opened);
    controller.tick();
    assert_eq!(
        controller.state().status(),
        "Connected to server, starting generation..."
    );

    recorder.event(r#"{"event":"progress","data":"Rendering","progress":42}"#);
    controller.tick();
    assert_eq!(controller.state().status(), "Rendering (42%)");
    assert_eq!(controller.state().progress(), 42.0);
}

#[test]
fn complete_event_finishes_the_run() {
    let (mut controller, recorder) = detecting_controller();
    recorder.show("Victory");
    controller.tick();

    recorder.event(r#"{"event":"status","data":"Queued"}"#);
    recorder.event(r#"{"event":"complete","image":"/outputs/city.png"}"#);
    controller.tick();

    let state = controller.state();
    assert_eq!(state.lifecycle(), Lifecycle::Idle);
    assert_eq!(state.image(), Some("/outputs/city.png"));
    assert_eq!(state.progress(), 100.0);
    assert_eq!(state.status(), "Generation complete!");
    assert_eq!(
        state.result().unwrap().text,
        format!(
            "Successfully generated: {}",
            prompts::prompt_for("Victory").unwrap()
        )
    );
    assert!(!controller.has_open_run());
    assert_eq!(recorder.closes(), 1);
}

#[test]
fn hang_up_after_complete_reports_connection_closed() {
    let (mut controller, recorder) = detecting_controller();
    recorder.show("Thumb_Up");
    controller.tick();

    recorder.event(r#"{"event":"complete","image":"/outputs/forest.png"}"#);
    recorder.send(ChannelMessage::Failed(StreamError::EndOfStream));
    controller.tick();

    let state = controller.state();
    assert_eq!(state.status(), "Connection closed");
    assert_eq!(state.lifecycle(), Lifecycle::Idle);
    assert_eq!(state.image(), Some("/outputs/forest.png"));
    assert_eq!(state.result().unwrap().kind, ResultKind::Success);
    assert!(!controller.has_open_run());
    assert_eq!(recorder.closes(), 1);
}

#[test]
fn transport_failure_returns_to_idle() {
    let (mut controller, recorder) = detecting_controller();
    recorder.show("Open_Palm");
    controller.tick();

    recorder.event(r#"{"event":"progress","data":"Sampling","progress":10}"#);
    recorder.send(ChannelMessage::Failed(StreamError::EndOfStream));
    controller.tick();

    let state = controller.state();
    assert_eq!(state.lifecycle(), Lifecycle::Idle);
    assert_eq!(state.status(), "Network error - try again");
    assert_eq!(state.progress(), 0.0);
    assert_eq!(state.result().unwrap().text, "Connection to server failed");
    assert_eq!(recorder.closes(), 1);
}

#[test]
fn second_generation_is_rejected_while_open() {
    let (mut controller, recorder) = detecting_controller();
    recorder.show("Closed_Fist");
    controller.tick();
    assert!(controller.has_open_run());

    assert_eq!(
        controller.generate("another prompt"),
        Err(SessionError::RunInProgress)
    );
    assert_eq!(
        controller.start_detection(),
        Err(SessionError::Generating)
    );
    assert_eq!(recorder.prompts().len(), 1);
}

#[test]
fn gestures_are_ignored_outside_detection() {
    let (mut controller, recorder) = ready_controller();
    assert_eq!(controller.handle_gesture("Thumb_Up"), GestureOutcome::Ignored);
    recorder.show("Thumb_Up");
    controller.tick();
    assert!(recorder.prompts().is_empty());
    assert_eq!(controller.state().lifecycle(), Lifecycle::Idle);
}

#[test]
fn stop_twice_is_a_no_op() {
    let (mut controller, recorder) = detecting_controller();
    assert_eq!(recorder.opens(), 1);

    assert!(controller.stop_detection());
    assert!(!controller.stop_detection());
    assert_eq!(recorder.stops(), 1);
    assert_eq!(controller.state().status(), "Gesture detection stopped");
    assert_eq!(controller.state().lifecycle(), Lifecycle::Idle);
}

#[test]
fn denied_camera_lands_in_idle() {
    let (mut controller, recorder) = ready_controller();
    recorder.deny_camera.store(true, Ordering::SeqCst);

    controller.start_detection().unwrap();
    let state = controller.state();
    assert_eq!(state.lifecycle(), Lifecycle::Idle);
    assert_eq!(state.status(), "Camera access denied");
    assert_eq!(state.detector_status(), "Camera access denied");
    assert!(!controller.camera_active());
}

#[test]
fn refused_stream_reports_initialization_failure() {
    let (mut controller, recorder) = detecting_controller();
    recorder.refuse_stream.store(true, Ordering::SeqCst);
    recorder.show("Pointing_Up");
    controller.tick();

    let state = controller.state();
    assert_eq!(state.lifecycle(), Lifecycle::Idle);
    assert_eq!(state.status(), "Failed to start generation");
    assert!(
        state
            .result()
            .unwrap()
            .text
            .starts_with("Initialization failed: ")
    );
    assert!(!controller.has_open_run());
}

#[test]
fn failed_model_blocks_detection() {
    let (mut controller, _) = controller_with(Err(anyhow::anyhow!("download failed")));
    controller.tick();
    assert_eq!(controller.state().model_status(), ModelStatus::Failed);
    assert_eq!(controller.state().detector_status(), "Failed to load model");
    assert_eq!(
        controller.start_detection(),
        Err(SessionError::ModelUnavailable)
    );
}

#[test]
fn detection_can_start_while_model_loads() {
    let (mut controller, recorder) = controller_with(Ok(()));
    controller.start_detection().unwrap();
    assert_eq!(controller.state().lifecycle(), Lifecycle::Detecting);
    assert_eq!(controller.state().detector_status(), "Loading model...");

    recorder.show("Thumb_Up");
    controller.tick();
    assert_eq!(
        controller.state().detector_status(),
        "Detected: Thumb_Up"
    );
}

#[test]
fn shutdown_releases_camera_and_stream() {
    let (mut controller, recorder) = detecting_controller();
    recorder.show("Thumb_Up");
    controller.tick();
    controller.shutdown();
    assert_eq!(recorder.closes(), 1);
    assert_eq!(recorder.stops(), 1);
    drop(controller);
    assert_eq!(recorder.closes(), 1);
}
