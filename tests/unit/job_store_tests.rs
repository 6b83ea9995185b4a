/*!
 * Tests for the job and content store contracts on the SQLite repository
 */

use anyhow::Result;
use std::sync::Arc;
use linguabatch::database::Repository;
use linguabatch::database::models::{FileStatus, GlossaryTermRecord, JobScope, JobStatus};
use linguabatch::jobs::{ContentStore, JobStore};
use crate::common;

fn file_scope(file_id: &str, target_language: &str) -> JobScope {
    JobScope::File {
        file_id: file_id.to_string(),
        target_language: target_language.to_string(),
    }
}

fn pair_scope(source_language: &str, target_language: &str) -> JobScope {
    JobScope::LanguagePair {
        source_language: source_language.to_string(),
        target_language: target_language.to_string(),
        domain: None,
    }
}

fn stores() -> Result<(Repository, Arc<dyn JobStore>, Arc<dyn ContentStore>)> {
    let repo = Repository::new_in_memory()?;
    Ok((repo.clone(), Arc::new(repo.clone()), Arc::new(repo)))
}

#[tokio::test]
async fn test_create_shouldStartPendingWithZeroCounters() -> Result<()> {
    let (_, jobs, _) = stores()?;

    let job_id = jobs.create("alice", pair_scope("en", "fr"), Some(40)).await?;
    let job = jobs.get(&job_id).await?.expect("job should exist");

    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.progress, 0);
    assert_eq!(job.updated_count, 0);
    assert_eq!(job.target_count, Some(40));
    assert_eq!(job.user_id, "alice");
    assert_eq!(job.scope, pair_scope("en", "fr"));
    Ok(())
}

#[tokio::test]
async fn test_requestStop_onActiveJob_shouldOnlySetStopped() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let job_id = jobs.create("alice", file_scope("f1", "de"), None).await?;
    assert!(jobs.set_status(&job_id, JobStatus::Processing, None).await?);
    jobs.increment_progress(&job_id, 4).await?;

    assert!(jobs.request_stop(&job_id).await?);

    let job = jobs.get(&job_id).await?.expect("job should exist");
    assert_eq!(job.status, JobStatus::Stopped);
    assert_eq!(job.progress, 4);
    assert!(job.error_detail.is_none());
    Ok(())
}

#[tokio::test]
async fn test_requestStop_onTerminalJob_shouldBeRefused() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let job_id = jobs.create("alice", file_scope("f1", "de"), None).await?;
    jobs.set_status(&job_id, JobStatus::Completed, None).await?;

    assert!(!jobs.request_stop(&job_id).await?);
    assert_eq!(jobs.get(&job_id).await?.map(|j| j.status), Some(JobStatus::Completed));
    Ok(())
}

#[tokio::test]
async fn test_requestStop_onUnknownJob_shouldReturnFalse() -> Result<()> {
    let (_, jobs, _) = stores()?;
    assert!(!jobs.request_stop("missing").await?);
    Ok(())
}

#[tokio::test]
async fn test_setStatus_afterStop_shouldNotResurrectJob() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let job_id = jobs.create("alice", file_scope("f1", "de"), None).await?;
    jobs.request_stop(&job_id).await?;

    assert!(!jobs.set_status(&job_id, JobStatus::Completed, None).await?);
    assert!(!jobs.set_status(&job_id, JobStatus::Failed, Some("late".to_string())).await?);

    let job = jobs.get(&job_id).await?.expect("job should exist");
    assert_eq!(job.status, JobStatus::Stopped);
    assert!(job.error_detail.is_none());
    Ok(())
}

#[tokio::test]
async fn test_setStatus_failedWithDetail_shouldKeepDetail() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let job_id = jobs.create("alice", pair_scope("en", "fr"), Some(5)).await?;

    jobs.set_status(&job_id, JobStatus::Failed, Some("provider offline".to_string())).await?;

    let job = jobs.get(&job_id).await?.expect("job should exist");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_detail.as_deref(), Some("provider offline"));
    Ok(())
}

#[tokio::test]
async fn test_incrementProgress_shouldBeMonotonicAndClamped() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let job_id = jobs.create("alice", pair_scope("en", "fr"), Some(25)).await?;

    let mut seen = Vec::new();
    for _ in 0..4 {
        jobs.increment_progress(&job_id, 10).await?;
        seen.push(jobs.get(&job_id).await?.map(|j| j.progress).unwrap_or_default());
    }

    assert_eq!(seen, vec![10, 20, 25, 25]);
    Ok(())
}

#[tokio::test]
async fn test_counters_onTerminalJob_shouldBeFrozen() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let job_id = jobs.create("alice", file_scope("f1", "de"), None).await?;
    jobs.increment_progress(&job_id, 3).await?;
    jobs.increment_updated(&job_id, 2).await?;
    jobs.request_stop(&job_id).await?;

    assert!(!jobs.increment_progress(&job_id, 5).await?);
    jobs.increment_updated(&job_id, 5).await?;

    let job = jobs.get(&job_id).await?.expect("job should exist");
    assert_eq!(job.progress, 3);
    assert_eq!(job.updated_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_findActive_shouldIgnoreFinishedJobsAndOtherScopes() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let done = jobs.create("alice", pair_scope("en", "fr"), Some(5)).await?;
    jobs.set_status(&done, JobStatus::Completed, None).await?;
    jobs.create("alice", pair_scope("en", "de"), Some(5)).await?;

    assert!(jobs.find_active(&pair_scope("en", "fr")).await?.is_none());

    let running = jobs.create("bob", pair_scope("en", "fr"), Some(5)).await?;
    let active = jobs.find_active(&pair_scope("en", "fr")).await?.expect("active job");
    assert_eq!(active.id, running);

    let file_job = jobs.create("bob", file_scope("f1", "fr"), None).await?;
    assert_eq!(jobs.find_active(&file_scope("f1", "fr")).await?.map(|j| j.id), Some(file_job));
    assert!(jobs.find_active(&file_scope("f1", "es")).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_list_shouldFilterByUserNewestFirst() -> Result<()> {
    let (_, jobs, _) = stores()?;
    let first = jobs.create("alice", pair_scope("en", "fr"), Some(5)).await?;
    jobs.create("bob", pair_scope("en", "de"), Some(5)).await?;
    let third = jobs.create("alice", file_scope("f1", "fr"), None).await?;

    let listed: Vec<String> = jobs.list(Some("alice"), 10).await?.into_iter().map(|j| j.id).collect();
    assert_eq!(listed, vec![third, first]);
    assert_eq!(jobs.list(None, 2).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_fileFlag_shouldBeClaimedOnceUntilReleased() -> Result<()> {
    let (repo, _, content) = stores()?;
    let (file, _) = common::seed_file(&repo, "alice", 1, "fr").await?;

    assert!(content.try_begin_file_translation(&file.id).await?);
    assert!(!content.try_begin_file_translation(&file.id).await?);
    assert!(content.is_file_translating(&file.id).await?);

    content.end_file_translation(&file.id).await?;
    assert!(!content.is_file_translating(&file.id).await?);
    assert!(content.try_begin_file_translation(&file.id).await?);
    Ok(())
}

#[tokio::test]
async fn test_transitionFileStatus_shouldOnlyMoveFromExpectedState() -> Result<()> {
    let (repo, _, content) = stores()?;
    let (file, _) = common::seed_file(&repo, "alice", 1, "fr").await?;

    assert!(content.transition_file_status(&file.id, FileStatus::Draft, FileStatus::InProgress).await?);
    assert!(!content.transition_file_status(&file.id, FileStatus::Draft, FileStatus::InProgress).await?);

    let stored = content.get_file(&file.id).await?.expect("file should exist");
    assert_eq!(stored.status, FileStatus::InProgress);
    Ok(())
}

#[tokio::test]
async fn test_saveUnitTranslation_shouldSkipConfirmedUnits() -> Result<()> {
    let (repo, _, content) = stores()?;
    let (file, ids) = common::seed_file(&repo, "alice", 2, "fr").await?;
    repo.confirm_unit(ids[1], "Texte validé").await?;

    assert!(content.save_unit_translation(ids[0], "Segment numéro 1.").await?);
    assert!(!content.save_unit_translation(ids[1], "Écrasé").await?);

    let units = content.get_units(&file.id, "fr").await?;
    assert_eq!(units[0].target_text, "Segment numéro 1.");
    assert_eq!(units[0].ai_suggestion.as_deref(), Some("Segment numéro 1."));
    assert_eq!(units[1].target_text, "Texte validé");
    assert!(units[1].is_confirmed());
    Ok(())
}

#[tokio::test]
async fn test_glossaryTerms_shouldRejectDuplicatesAndListRecentFirst() -> Result<()> {
    let (_, _, content) = stores()?;
    for (term, translation) in [("invoice", "facture"), ("ledger", "grand livre")] {
        let record = GlossaryTermRecord::new(
            term.to_string(),
            translation.to_string(),
            "en".to_string(),
            "fr".to_string(),
            "alice".to_string(),
        );
        assert!(content.insert_glossary_term(&record).await?);
    }

    let duplicate = GlossaryTermRecord::new(
        "invoice".to_string(),
        "note".to_string(),
        "en".to_string(),
        "fr".to_string(),
        "bob".to_string(),
    );
    assert!(!content.insert_glossary_term(&duplicate).await?);

    assert!(content.glossary_term_exists("invoice", "en", "fr").await?);
    assert!(!content.glossary_term_exists("invoice", "en", "de").await?);
    assert_eq!(content.recent_glossary_terms("en", "fr", 10).await?, vec!["ledger", "invoice"]);
    assert_eq!(content.recent_glossary_terms("en", "fr", 1).await?, vec!["ledger"]);
    Ok(())
}
