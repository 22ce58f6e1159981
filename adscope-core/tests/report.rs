mod common;

use adscope_core::analysis::{AnalysisError, MonthlyComparison, ReportOutcome};
use adscope_core::config::AgentConfig;
use adscope_core::config::constants::prompts;

use common::{Harness, date, row};

fn comparison(harness: &Harness, output_dir: &std::path::Path) -> MonthlyComparison {
    MonthlyComparison::new(
        harness.insights.clone(),
        harness.llm.clone(),
        harness.store.clone(),
        harness.clock.clone(),
        AgentConfig::default(),
        output_dir,
    )
}

#[tokio::test]
async fn writes_the_report_and_records_the_analysis() {
    let harness = Harness::new();
    harness.seed_two_months();
    harness.llm.push_text("  1. Canquén 5 bajó su costo por resultado.  ");
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("reports");

    let outcome = comparison(&harness, &output_dir)
        .run("111", Some(harness.user_id))
        .await
        .unwrap();
    let ReportOutcome::Generated(report) = outcome else {
        panic!("expected a generated report");
    };

    assert_eq!(report.conclusion, "1. Canquén 5 bajó su costo por resultado.");
    assert_eq!(
        report.path,
        output_dir.join("adscope_report__act_111__Lead_Form_2024_03-2024_04_20240515_100000.txt")
    );
    assert_eq!(std::fs::read_to_string(&report.path).unwrap(), report.conclusion);
    assert_eq!(report.last_month.start, date(2024, 4, 1));
    assert_eq!(report.previous_month.end, date(2024, 3, 31));

    let request = harness.llm.requests().pop().unwrap();
    assert_eq!(request.system_prompt.as_deref(), Some(prompts::REPORT_SYSTEM_PROMPT));
    let prompt = &request.messages[0].content;
    assert!(prompt.contains("## Tabla N (abril de 2024):"));
    assert!(prompt.contains("## Tabla N-1 (marzo de 2024):"));
    assert!(prompt.contains("| 102 | 2024-04-01 | 2024-04-30 | Canquén 6 _Lead Form |"));

    let stored = harness.store.list_analysis_results(harness.user_id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].analysis_type, "monthly_comparison");
    assert_eq!(stored[0].facebook_account_id, Some(harness.facebook_account_id));
    let metadata = stored[0].analysis_metadata.as_ref().unwrap();
    assert_eq!(metadata["ad_account_id"], "act_111");
    assert_eq!(metadata["last_month"]["campaigns"], 2);
    assert_eq!(metadata["previous_month"]["campaigns"], 1);

    let snapshots = harness
        .store
        .list_campaign_performance("act_111", date(2024, 3, 1), date(2024, 4, 30))
        .unwrap();
    assert_eq!(snapshots.len(), 3);
    assert!(
        snapshots
            .iter()
            .all(|snapshot| snapshot.facebook_account_id == Some(harness.facebook_account_id))
    );
}

#[tokio::test]
async fn skips_when_a_month_has_no_lead_form_data() {
    let harness = Harness::new();
    harness.insights.insert(
        "act_111",
        date(2024, 4, 1),
        date(2024, 4, 30),
        vec![row("101", "Canquén 5 _Lead Form", 1000.0, 3, date(2024, 4, 1), date(2024, 4, 30))],
    );
    let dir = tempfile::tempdir().unwrap();

    let outcome = comparison(&harness, dir.path()).run("act_111", None).await.unwrap();
    assert!(matches!(
        outcome,
        ReportOutcome::Skipped {
            last_month_rows: 1,
            previous_month_rows: 0
        }
    ));
    assert_eq!(harness.llm.request_count(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn empty_model_output_is_an_error() {
    let harness = Harness::new();
    harness.seed_two_months();
    harness.llm.push_text("   ");
    let dir = tempfile::tempdir().unwrap();

    let result = comparison(&harness, dir.path()).run("act_111", Some(harness.user_id)).await;
    assert!(matches!(result, Err(AnalysisError::EmptyAnalysis)));
    assert!(harness.store.list_analysis_results(harness.user_id).unwrap().is_empty());
}

#[tokio::test]
async fn graph_failures_propagate() {
    let harness = Harness::new();
    harness.insights.fail_account("act_111", "Unsupported get request");
    let dir = tempfile::tempdir().unwrap();

    let result = comparison(&harness, dir.path()).run("act_111", None).await;
    assert!(matches!(result, Err(AnalysisError::Facebook(_))));
}
