//! End-to-end bootstrap scenarios: a recording stack driver plus a mock
//! Ollama endpoint, exercising the full run sequence without containers.

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use aigw_bootstrap::workflow::render_bootstrap_summary;
use aigw_bootstrap::{
    run_bootstrap, BootstrapConfig, BootstrapError, ComposeBackend, OllamaClient, PollPlan,
    PullProgress, StackDriver,
};

const TEST_MODEL: &str = "llama3.1:8b";

#[derive(Debug, Default)]
struct RecordingDriver {
    calls: RefCell<Vec<String>>,
    gateway_state: String,
}

impl StackDriver for RecordingDriver {
    fn build_image(&self, service: &str) -> Result<(), BootstrapError> {
        self.calls.borrow_mut().push(format!("build {service}"));
        Ok(())
    }

    fn down_best_effort(&self) {
        self.calls.borrow_mut().push("down".to_string());
    }

    fn up_detached(&self, services: &[&str]) -> Result<(), BootstrapError> {
        self.calls
            .borrow_mut()
            .push(format!("up {}", services.join(",")));
        Ok(())
    }

    fn service_state(&self, service: &str) -> Result<String, BootstrapError> {
        self.calls.borrow_mut().push(format!("ps {service}"));
        Ok(self.gateway_state.clone())
    }
}

#[derive(Debug, Default)]
struct RecordingProgress {
    updates: Vec<String>,
}

impl PullProgress for RecordingProgress {
    fn update(&mut self, status: &str) {
        self.updates.push(status.to_string());
    }

    fn finish(&mut self) {}
}

fn scenario_config(dir: &Path, base_url: String, max_attempts: u32) -> BootstrapConfig {
    let mut config = BootstrapConfig::new(dir.to_path_buf());
    config.model = TEST_MODEL.to_string();
    config.ollama_base_url = base_url;
    config.settle_delay = Duration::from_millis(0);
    config.poll = PollPlan {
        interval: Duration::from_millis(1),
        max_attempts,
    };
    config
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .expect("metadata")
        .permissions()
        .mode()
        & 0o777
}

#[test]
fn integration_fresh_host_ready_on_third_probe_pulls_model_and_succeeds() {
    let server = MockServer::start();
    let failing_tags = server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(503);
    });
    let pull = server.mock(|when, then| {
        when.method(POST)
            .path("/api/pull")
            .json_body(json!({"name": TEST_MODEL}));
        then.status(200).body(
            "{\"status\":\"pulling manifest\"}\n\
             {\"status\":\"downloading\"}\n\
             {\"status\":\"success\"}\n",
        );
    });

    let tempdir = tempfile::tempdir().expect("tempdir");
    let config = scenario_config(tempdir.path(), server.base_url(), 30);
    let client = OllamaClient::new(server.base_url()).expect("client");
    let driver = RecordingDriver {
        gateway_state: "gateway running".to_string(),
        ..RecordingDriver::default()
    };
    let mut progress = RecordingProgress::default();

    // The dependency starts answering while the poller waits out its second
    // interval, so the third probe is the first success.
    let mut failing_tags = Some(failing_tags);
    let mut sleeps = 0u32;
    let mut sleeper = |_: Duration| {
        sleeps += 1;
        if sleeps == 2 {
            if let Some(mut mock) = failing_tags.take() {
                mock.delete();
            }
            server.mock(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200).json_body(json!({"models": []}));
            });
        }
    };

    let report = run_bootstrap(
        &config,
        ComposeBackend::PodmanCompose,
        1000,
        &driver,
        &client,
        &mut progress,
        &mut sleeper,
    )
    .expect("bootstrap succeeds");

    assert_eq!(report.readiness_attempts, 3);
    assert!(report.model_freshly_pulled);
    pull.assert_calls(1);
    assert_eq!(
        progress.updates,
        vec!["pulling manifest", "downloading", "success"]
    );

    // The secrets file was created, restricted, and holds the reported token.
    let secrets = std::fs::read_to_string(&config.secrets_path).expect("secrets file");
    assert!(secrets.contains(&format!("GATEWAY_TOKEN={}", report.token)));
    assert_eq!(report.token.len(), 64);
    #[cfg(unix)]
    assert_eq!(file_mode(&config.secrets_path), 0o600);

    let summary = render_bootstrap_summary(&report);
    assert!(summary.contains(&report.token));
    assert!(summary.contains(TEST_MODEL));

    assert_eq!(
        *driver.calls.borrow(),
        vec![
            "build gateway",
            "down",
            "up ollama",
            "up gateway,ollama",
            "ps gateway",
        ]
    );
}

#[test]
fn integration_dependency_never_ready_stops_before_pull_and_service_start() {
    let server = MockServer::start();
    let tags = server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(503);
    });
    let pull = server.mock(|when, then| {
        when.method(POST).path("/api/pull");
        then.status(200).body("{\"status\":\"success\"}\n");
    });

    let tempdir = tempfile::tempdir().expect("tempdir");
    let config = scenario_config(tempdir.path(), server.base_url(), 3);
    let client = OllamaClient::new(server.base_url()).expect("client");
    let driver = RecordingDriver::default();
    let mut progress = RecordingProgress::default();
    let mut sleeper = |_: Duration| {};

    let error = run_bootstrap(
        &config,
        ComposeBackend::PodmanCompose,
        1000,
        &driver,
        &client,
        &mut progress,
        &mut sleeper,
    )
    .expect_err("timeout is fatal");

    match error {
        BootstrapError::DependencyTimedOut {
            service, attempts, ..
        } => {
            assert_eq!(service, "ollama");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Exactly the attempt budget was spent, then nothing else ran.
    tags.assert_calls(3);
    pull.assert_calls(0);
    assert!(progress.updates.is_empty());
    assert_eq!(
        *driver.calls.borrow(),
        vec!["build gateway", "down", "up ollama"]
    );
}

#[test]
fn integration_model_already_listed_skips_the_pull() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200)
            .json_body(json!({"models": [{"name": TEST_MODEL}]}));
    });
    let pull = server.mock(|when, then| {
        when.method(POST).path("/api/pull");
        then.status(200).body("{\"status\":\"success\"}\n");
    });

    let tempdir = tempfile::tempdir().expect("tempdir");
    let config = scenario_config(tempdir.path(), server.base_url(), 30);
    let client = OllamaClient::new(server.base_url()).expect("client");
    let driver = RecordingDriver {
        gateway_state: "Up 2 seconds".to_string(),
        ..RecordingDriver::default()
    };
    let mut progress = RecordingProgress::default();
    let mut sleeper = |_: Duration| {};

    let report = run_bootstrap(
        &config,
        ComposeBackend::PodmanBuiltin,
        1000,
        &driver,
        &client,
        &mut progress,
        &mut sleeper,
    )
    .expect("bootstrap succeeds");

    assert!(!report.model_freshly_pulled);
    assert!(report.gateway_verified);
    pull.assert_calls(0);
    assert!(progress.updates.is_empty());
}

#[test]
fn integration_pre_existing_token_survives_a_full_run_unchanged() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200)
            .json_body(json!({"models": [{"name": TEST_MODEL}]}));
    });

    let tempdir = tempfile::tempdir().expect("tempdir");
    let config = scenario_config(tempdir.path(), server.base_url(), 30);
    let seeded_token = "f".repeat(64);
    std::fs::write(
        &config.secrets_path,
        format!("# provisioned earlier\nGATEWAY_TOKEN={seeded_token}\n"),
    )
    .expect("seed secrets");

    let client = OllamaClient::new(server.base_url()).expect("client");
    let driver = RecordingDriver {
        gateway_state: "running".to_string(),
        ..RecordingDriver::default()
    };
    let mut progress = RecordingProgress::default();
    let mut sleeper = |_: Duration| {};

    let report = run_bootstrap(
        &config,
        ComposeBackend::PodmanCompose,
        1000,
        &driver,
        &client,
        &mut progress,
        &mut sleeper,
    )
    .expect("bootstrap succeeds");

    assert_eq!(report.token, seeded_token);
    let secrets = std::fs::read_to_string(&config.secrets_path).expect("secrets file");
    assert!(secrets.contains("# provisioned earlier"));
    assert!(secrets.contains(&format!("GATEWAY_TOKEN={seeded_token}")));
    #[cfg(unix)]
    assert_eq!(file_mode(&config.secrets_path), 0o600);
}
