use std::time::{Duration, Instant};

use headcount::{CounterConfigPatch, HeadcountConfig, Session};

fn fast_config() -> HeadcountConfig {
    let mut cfg = HeadcountConfig::default();
    cfg.camera.device = "stub://test".to_string();
    cfg.sample_interval = Duration::from_millis(20);
    cfg
}

fn wait_until<F>(deadline: Duration, mut done: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn pipeline_samples_frames_and_counts_people() {
    let mut session = Session::new(fast_config());
    session.start_detection().expect("start");
    assert!(session.is_running());

    assert!(
        wait_until(Duration::from_secs(2), || {
            session.telemetry().expect("telemetry").frames_sampled >= 5
        }),
        "sampler made no progress"
    );

    session.stop_detection().expect("stop");
    assert!(!session.is_running());

    let telemetry = session.telemetry().expect("telemetry");
    let stats = session.stats().expect("stats");
    assert!(telemetry.frames_sampled >= 5);
    // The counter mirrors the translator, which mirrors the last count.
    assert_eq!(u64::from(stats.current), stats.entries - stats.exits);
    assert_eq!(stats.current, telemetry.last_result.count as u32);

    // Stopped means frozen: no further samples arrive.
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(
        session.telemetry().expect("telemetry").frames_sampled,
        telemetry.frames_sampled
    );
}

#[test]
fn detection_can_be_restarted() {
    let mut session = Session::new(fast_config());
    session.start_detection().expect("first start");
    assert!(wait_until(Duration::from_secs(2), || {
        session.telemetry().expect("telemetry").frames_sampled >= 2
    }));
    session.stop_detection().expect("stop");
    let frozen = session.telemetry().expect("telemetry").frames_sampled;

    session.start_detection().expect("second start");
    assert!(
        wait_until(Duration::from_secs(2), || {
            session.telemetry().expect("telemetry").frames_sampled > frozen
        }),
        "no samples after restart"
    );
    session.stop_detection().expect("second stop");
}

#[test]
fn stopping_an_idle_session_is_a_noop() {
    let mut session = Session::new(fast_config());
    session.stop_detection().expect("stop before start");

    session.start_detection().expect("start");
    session.stop_detection().expect("first stop");
    session.stop_detection().expect("second stop");
}

#[test]
fn camera_failure_starts_nothing() {
    let mut cfg = fast_config();
    cfg.camera.device = "rtsp://nonexistent".to_string();

    let mut session = Session::new(cfg);
    let err = session.start_detection().expect_err("camera must fail");
    assert!(err.to_string().contains("camera acquisition failed"));
    assert!(!session.is_running());

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(session.telemetry().expect("telemetry").frames_sampled, 0);
}

#[test]
fn alerts_flow_through_the_session() {
    let mut session = Session::new(fast_config());
    session.start_detection().expect("start");
    session
        .update_config(CounterConfigPatch {
            threshold: Some(1),
            ..CounterConfigPatch::default()
        })
        .expect("patch");

    // The simulated strategy reports 1+ people on most frames, so the
    // lowered threshold is crossed almost immediately.
    assert!(
        wait_until(Duration::from_secs(3), || {
            !session.alerts().expect("alerts").is_empty()
        }),
        "no alert raised at threshold 1"
    );

    session.stop_detection().expect("stop");
    let alerts = session.alerts().expect("alerts");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Threshold Exceeded");

    session.dismiss_alert(&alerts[0].id).expect("dismiss");
    assert!(session.alerts().expect("alerts").is_empty());
}

#[test]
fn session_clock_ticks_while_enabled() {
    let mut session = Session::new(fast_config());
    session.start_detection().expect("start");
    assert!(
        wait_until(Duration::from_secs(3), || {
            session.stats().expect("stats").session_duration != "00:00:00"
        }),
        "session clock never ticked"
    );
    session.stop_detection().expect("stop");
}

#[test]
fn session_clock_is_gated_by_the_flag() {
    let mut cfg = fast_config();
    cfg.counter.session_timer = false;

    let mut session = Session::new(cfg);
    session.start_detection().expect("start");
    std::thread::sleep(Duration::from_millis(1_500));
    assert_eq!(session.stats().expect("stats").session_duration, "00:00:00");
    session.stop_detection().expect("stop");
}

#[test]
fn dropping_a_running_session_tears_down_cleanly() {
    let mut session = Session::new(fast_config());
    session.start_detection().expect("start");
    drop(session);
}
