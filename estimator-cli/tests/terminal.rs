//! Scripted runs of the terminal wizard.

use std::sync::Arc;
use std::time::Duration;

use estimator_cli::app::Stores;
use estimator_cli::terminal::{RunSummary, Terminal};
use estimator_core::analytics::RecordingAnalytics;
use estimator_core::config::EstimatorConfig;
use estimator_core::wizard::{WizardEvent, WizardSession};
use estimator_core::wizard::pipeline::UNCONFIGURED_MESSAGE;
use estimator_core::{
    AnswerUpdate, MaterialType, ProductVariant, PropertyType, ServiceType, SubmissionRepository,
};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncWriteExt, BufReader};

async fn run_script(
    config: &EstimatorConfig,
    stores: &Stores,
    script: &str,
) -> (RunSummary, String) {
    let mut session = WizardSession::new(
        config,
        stores.pipeline(config, true),
        Arc::new(RecordingAnalytics::new()),
    );
    let mut terminal = Terminal::new(script.as_bytes(), Vec::new());

    let summary = terminal.run(&mut session).await.expect("run should finish");
    let output = String::from_utf8(terminal.into_writer()).expect("utf-8 output");
    (summary, output)
}

#[tokio::test]
async fn fence_run_retries_invalid_contact_details() {
    let config = EstimatorConfig::default();
    let script = "\
2
new installation
wood, 4
Backyard fence
John Doe
not-an-email
555-123-4567
123 Main St
12345

john@example.com



:quit
";

    let (summary, output) = run_script(&config, &Stores::default(), script).await;

    assert_eq!(summary, RunSummary { submitted: 1, succeeded: 1 });
    assert_eq!(output.matches("Step 5 of 5").count(), 2);
    assert!(output.contains("! Please enter a valid email address"));
    assert!(output.contains("Full name [John Doe]"));
    assert!(output.contains(UNCONFIGURED_MESSAGE));
}

#[tokio::test]
async fn back_returns_to_previous_step() {
    let config = EstimatorConfig::default();
    let script = "1\n:back\n:quit\n";

    let (summary, output) = run_script(&config, &Stores::default(), script).await;

    assert_eq!(summary, RunSummary::default());
    assert_eq!(output.matches("Step 1 of 5").count(), 2);
    assert_eq!(output.matches("Step 2 of 5").count(), 1);
    assert!(output.contains("Property type [Commercial]"));
}

#[tokio::test]
async fn unknown_option_is_asked_again() {
    let config = EstimatorConfig::default();
    let script = "Castle\n2\n";

    let (_, output) = run_script(&config, &Stores::default(), script).await;

    assert!(output.contains("Enter a number from 1 to 3"));
    assert!(output.contains("Step 2 of 5"));
}

#[tokio::test]
async fn shower_run_is_stored_then_form_resets() {
    let config = EstimatorConfig {
        variant: ProductVariant::Shower,
        database_url: Some(":memory:".to_string()),
        ..EstimatorConfig::default()
    };
    let stores = Stores::open(&config).await.expect("stores");
    let script = "\
1
none, high threshold
2
good
y
60601
Robert Johnson
robert@example.com
555-555-5555
789 Michigan Ave

";

    let (summary, output) = run_script(&config, &stores, script).await;

    assert_eq!(summary, RunSummary { submitted: 1, succeeded: 1 });
    // Dismissing the success message starts a fresh form.
    assert_eq!(output.matches("Step 1 of 7").count(), 2);
    assert!(output.contains("Project [Not sure]"));

    let primary = stores.primary.clone().expect("primary store");
    let stored = primary.list_submissions().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].zip_code.as_deref(), Some("60601"));
    assert!(stored[0].project_details.contains("Shower issues: High threshold"));
    assert!(stored[0].project_details.contains("Water heater: Tankless water heater"));
}

#[tokio::test]
async fn empty_input_leaves_quietly() {
    let (summary, output) = run_script(&EstimatorConfig::default(), &Stores::default(), "").await;

    assert_eq!(summary, RunSummary::default());
    assert!(output.contains("Step 1 of 5"));
}

async fn submit_fence(session: &mut WizardSession) {
    session
        .handle(WizardEvent::Edit(AnswerUpdate {
            property_type: Some(PropertyType::Residential),
            service_type: Some(ServiceType::Replacement),
            full_name: Some("Jane Smith".to_string()),
            email: Some("jane@example.com".to_string()),
            phone: Some("555-987-6543".to_string()),
            address: Some("456 Oak Ave".to_string()),
            zip_code: Some("54321".to_string()),
            ..AnswerUpdate::default()
        }))
        .await;
    session.handle(WizardEvent::ToggleMaterial(MaterialType::Wood)).await;
    for _ in 0..5 {
        session.handle(WizardEvent::Advance).await;
    }
}

#[tokio::test(start_paused = true)]
async fn stale_reset_timer_is_not_announced() {
    let config = EstimatorConfig {
        reset_timeout: Duration::from_millis(1000),
        ..EstimatorConfig::default()
    };
    let mut session = WizardSession::new(
        &config,
        Stores::default().pipeline(&config, true),
        Arc::new(RecordingAnalytics::new()),
    );

    // Let the first timer fire, then leave the screen before it is applied.
    submit_fence(&mut session).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    session.handle(WizardEvent::Dismiss).await;
    submit_fence(&mut session).await;

    let (mut input, reader) = tokio::io::duplex(64);
    let mut terminal = Terminal::new(BufReader::new(reader), Vec::new());
    let (summary, ()) = tokio::join!(terminal.run(&mut session), async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        input.write_all(b":quit\n").await.unwrap();
    });
    summary.expect("run should finish");
    let output = String::from_utf8(terminal.into_writer()).unwrap();

    assert_eq!(output.matches("Starting a new estimate.").count(), 1);
    assert_eq!(output.matches("Press Enter to start a new estimate").count(), 1);
    assert!(output.contains("Step 1 of 5"));
}
