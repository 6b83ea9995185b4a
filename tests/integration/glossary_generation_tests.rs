/*!
 * Integration tests for the glossary generation runner
 */

use anyhow::Result;
use std::sync::Arc;
use linguabatch::database::Repository;
use linguabatch::database::models::{GlossaryTermRecord, JobScope, JobStatus, NotificationKind};
use linguabatch::jobs::{GlossaryGenerationJob, GlossaryGenerationRunner, JobStore, RunnerSettings};
use linguabatch::translation::{GeneratedTerm, GlossaryGenerator};
use crate::common;
use crate::common::mock_services::{term, RecordingNotifier, ScriptedGenerator, StopAfterCheckpoints};

const USER: &str = "carol";

fn settings(glossary_batch_size: usize) -> RunnerSettings {
    common::fast_settings(10).with_glossary_batch_size(glossary_batch_size)
}

async fn schedule(repo: &Repository, target_language: &str, count: usize, domain: Option<&str>) -> Result<GlossaryGenerationJob> {
    let scope = JobScope::LanguagePair {
        source_language: "en".to_string(),
        target_language: target_language.to_string(),
        domain: domain.map(str::to_string),
    };
    let job_id = JobStore::create(repo, USER, scope, Some(count as i64)).await?;
    Ok(GlossaryGenerationJob {
        job_id,
        user_id: USER.to_string(),
        source_language: "en".to_string(),
        target_language: target_language.to_string(),
        count,
        domain: domain.map(str::to_string),
    })
}

fn runner(repo: &Repository, generator: Arc<dyn GlossaryGenerator>, notifier: Arc<RecordingNotifier>, settings: RunnerSettings) -> GlossaryGenerationRunner {
    GlossaryGenerationRunner::new(Arc::new(repo.clone()), Arc::new(repo.clone()), generator, notifier, settings)
}

async fn seed_term(repo: &Repository, term: &str, target_language: &str) -> Result<()> {
    let record = GlossaryTermRecord::new(
        term.to_string(),
        format!("{}-{}", term, target_language),
        "en".to_string(),
        target_language.to_string(),
        "someone".to_string(),
    );
    repo.insert_glossary_term(&record).await?;
    Ok(())
}

#[tokio::test]
async fn test_run_shouldInsertOnlyNovelTerms() -> Result<()> {
    common::init_logging();
    let repo = Repository::new_in_memory()?;
    seed_term(&repo, "invoice", "fr").await?;
    // Same term for another pair does not count as existing
    seed_term(&repo, "ledger", "de").await?;

    let mut refund = term("refund", "remboursement");
    refund.definition = Some("Money given back.".to_string());
    let generator = Arc::new(ScriptedGenerator::with_batches(vec![
        vec![term("invoice", "facture"), term("ledger", "grand livre"), term("ledger", "registre"), refund],
        vec![term("audit", "audit")],
    ]));
    let notifier = Arc::new(RecordingNotifier::default());
    let job = schedule(&repo, "fr", 6, Some("finance")).await?;

    let summary = runner(&repo, generator.clone(), notifier.clone(), settings(4)).run(job.clone()).await;

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.processed, 6);
    assert_eq!(summary.updated, 3);

    let record = repo.get_job(&job.job_id).await?.expect("job should exist");
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.progress, 6);
    assert_eq!(record.updated_count, 3);

    let requests = generator.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].count, 4);
    assert_eq!(requests[1].count, 2);
    assert_eq!(requests[0].domain.as_deref(), Some("finance"));
    assert_eq!(requests[0].existing_terms, vec!["invoice".to_string()]);
    assert!(requests[1].existing_terms.contains(&"refund".to_string()));

    let stored = repo.list_glossary_terms("en", "fr", 10).await?;
    let names: Vec<&str> = stored.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(names, vec!["audit", "refund", "ledger", "invoice"]);
    let ledger = stored.iter().find(|t| t.term == "ledger").expect("ledger");
    assert_eq!(ledger.translation, "grand livre");
    assert_eq!(ledger.domain.as_deref(), Some("finance"));
    assert_eq!(ledger.created_by, USER);
    let refund = stored.iter().find(|t| t.term == "refund").expect("refund");
    assert_eq!(refund.definition.as_deref(), Some("Money given back."));

    let last = notifier.last().expect("notification");
    assert_eq!(last.kind, NotificationKind::Success);
    assert_eq!(last.message, "3 new glossary terms added");
    assert_eq!(last.link.as_deref(), Some("/glossary?source=en&target=fr"));
    Ok(())
}

#[tokio::test]
async fn test_run_withEmptyAnswer_shouldFinishEarly() -> Result<()> {
    let repo = Repository::new_in_memory()?;
    let generator = Arc::new(ScriptedGenerator::with_batches(vec![vec![
        term("asset", "actif"),
        term("equity", "capitaux propres"),
    ]]));
    let job = schedule(&repo, "fr", 10, None).await?;

    let summary = runner(&repo, generator.clone(), Arc::new(RecordingNotifier::default()), settings(5))
        .run(job.clone())
        .await;

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.updated, 2);
    assert_eq!(generator.requests().len(), 2);

    let record = repo.get_job(&job.job_id).await?.expect("job should exist");
    assert_eq!(record.progress, 5);
    assert_eq!(record.target_count, Some(10));
    Ok(())
}

#[tokio::test]
async fn test_run_withOnlyDuplicates_shouldStillEndAndWarn() -> Result<()> {
    let repo = Repository::new_in_memory()?;
    seed_term(&repo, "asset", "fr").await?;
    let repeated: Vec<GeneratedTerm> = vec![term("asset", "actif"), term("asset", "bien")];
    let generator = Arc::new(ScriptedGenerator::with_batches(vec![repeated.clone(), repeated]));
    let notifier = Arc::new(RecordingNotifier::default());
    let job = schedule(&repo, "fr", 4, None).await?;

    let summary = runner(&repo, generator, notifier.clone(), settings(2)).run(job.clone()).await;

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.updated, 0);

    let last = notifier.last().expect("notification");
    assert_eq!(last.kind, NotificationKind::Warning);
    assert_eq!(last.title, "Glossary generation finished without new terms");
    assert_eq!(repo.list_glossary_terms("en", "fr", 10).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_withStopAfterFirstBatch_shouldStop() -> Result<()> {
    let repo = Repository::new_in_memory()?;
    let generator = Arc::new(ScriptedGenerator::with_batches(vec![
        vec![term("debit", "débit"), term("credit", "crédit")],
        vec![term("asset", "actif"), term("equity", "capitaux propres")],
        vec![term("audit", "audit"), term("ledger", "grand livre")],
    ]));
    let notifier = Arc::new(RecordingNotifier::default());
    let job = schedule(&repo, "fr", 6, None).await?;

    let runner = GlossaryGenerationRunner::new(
        Arc::new(StopAfterCheckpoints::new(repo.clone(), 1)),
        Arc::new(repo.clone()),
        generator.clone(),
        notifier.clone(),
        settings(2),
    );
    let summary = runner.run(job.clone()).await;

    assert_eq!(summary.status, JobStatus::Stopped);
    assert_eq!(summary.processed, 2);
    assert_eq!(generator.requests().len(), 1);

    let record = repo.get_job(&job.job_id).await?.expect("job should exist");
    assert_eq!(record.status, JobStatus::Stopped);
    assert_eq!(record.progress, 2);
    assert_eq!(repo.list_glossary_terms("en", "fr", 10).await?.len(), 2);

    let last = notifier.last().expect("notification");
    assert_eq!(last.title, "Glossary generation stopped");
    assert_eq!(last.message, "Glossary generation stopped after 2 terms were requested, 2 added");
    Ok(())
}

#[tokio::test]
async fn test_run_withGeneratorFailure_shouldFail() -> Result<()> {
    let repo = Repository::new_in_memory()?;
    let notifier = Arc::new(RecordingNotifier::default());
    let job = schedule(&repo, "fr", 5, None).await?;

    let summary = runner(&repo, Arc::new(ScriptedGenerator::failing()), notifier.clone(), settings(5))
        .run(job.clone())
        .await;

    assert_eq!(summary.status, JobStatus::Failed);
    let detail = summary.error_detail.expect("error detail");
    assert!(detail.starts_with("Glossary generation request failed"), "unexpected detail: {}", detail);
    assert!(detail.contains("invalid api key"));

    let record = repo.get_job(&job.job_id).await?.expect("job should exist");
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.error_detail, Some(detail));

    assert_eq!(notifier.kinds(), vec![NotificationKind::Info, NotificationKind::Error]);
    Ok(())
}

#[tokio::test]
async fn test_run_whenStoppedBeforeStart_shouldNotCallGenerator() -> Result<()> {
    let repo = Repository::new_in_memory()?;
    let generator = Arc::new(ScriptedGenerator::with_batches(vec![vec![term("asset", "actif")]]));
    let job = schedule(&repo, "fr", 5, None).await?;
    assert!(repo.request_job_stop(&job.job_id).await?);

    let summary = runner(&repo, generator.clone(), Arc::new(RecordingNotifier::default()), settings(5))
        .run(job)
        .await;

    assert_eq!(summary.status, JobStatus::Stopped);
    assert!(generator.requests().is_empty());
    Ok(())
}
