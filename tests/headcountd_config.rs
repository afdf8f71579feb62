use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use headcount::config::HeadcountConfig;
use headcount::ModelKind;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "HEADCOUNT_CONFIG",
        "HEADCOUNT_DEVICE",
        "HEADCOUNT_MODEL",
        "HEADCOUNT_THRESHOLD",
        "HEADCOUNT_CONFIDENCE_THRESHOLD",
        "HEADCOUNT_SAMPLE_INTERVAL_MS",
        "HEADCOUNT_EXPORT_PATH",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
            "camera": {
                "device": "stub://entrance",
                "width": 800,
                "height": 600
            },
            "detection": {
                "model": "neural-net",
                "confidence_threshold": 0.6,
                "nms_threshold": 0.4,
                "input_size": 416
            },
            "counter": {
                "threshold": 25,
                "alerts_enabled": true,
                "email_alerts": true,
                "session_timer": false
            },
            "sample_interval_ms": 500,
            "export_csv_path": "exports/traffic.csv"
        }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("HEADCOUNT_CONFIG", file.path());
    std::env::set_var("HEADCOUNT_MODEL", "classical-cv");
    std::env::set_var("HEADCOUNT_THRESHOLD", "30");

    let cfg = HeadcountConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://entrance");
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    // Environment wins over the file.
    assert_eq!(cfg.detection.model, ModelKind::ClassicalCv);
    assert_eq!(cfg.counter.threshold, 30);
    assert!((cfg.detection.confidence_threshold - 0.6).abs() < f32::EPSILON);
    assert!((cfg.detection.nms_threshold - 0.4).abs() < f32::EPSILON);
    assert_eq!(cfg.detection.input_size, 416);
    assert!(cfg.counter.email_alerts);
    assert!(!cfg.counter.session_timer);
    // Counter fields the file omits keep their defaults.
    assert!(cfg.counter.auto_log);
    assert_eq!(cfg.sample_interval.as_millis(), 500);
    assert_eq!(cfg.export_csv_path, PathBuf::from("exports/traffic.csv"));

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = HeadcountConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://lobby");
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.detection.model, ModelKind::Simulated);
    assert_eq!(cfg.detection.input_size, 300);
    assert_eq!(cfg.counter.threshold, 10);
    assert!(cfg.counter.alerts_enabled);
    assert!(!cfg.counter.email_alerts);
    assert_eq!(cfg.sample_interval.as_secs(), 1);
    assert_eq!(cfg.export_csv_path, PathBuf::from("headcount_hourly.csv"));

    clear_env();
}

#[test]
fn rejects_unknown_model_tag() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HEADCOUNT_MODEL", "tensor-rt");
    let err = HeadcountConfig::load().expect_err("unknown model must fail");
    assert!(err.to_string().contains("unknown model kind"));

    clear_env();
}

#[test]
fn rejects_out_of_range_confidence() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HEADCOUNT_CONFIDENCE_THRESHOLD", "1.5");
    let err = HeadcountConfig::load().expect_err("confidence out of range must fail");
    assert!(err.to_string().contains("confidence_threshold"));

    clear_env();
}

#[test]
fn rejects_zero_sample_interval() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HEADCOUNT_SAMPLE_INTERVAL_MS", "0");
    let err = HeadcountConfig::load().expect_err("zero interval must fail");
    assert!(err.to_string().contains("sample interval"));

    clear_env();
}
