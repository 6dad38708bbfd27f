mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{Harness, calls, id_of};
use deposit_actors::{ActorError, AttachOutcome, work_key};
use deposit_core::{CallbackEvent, FileSet, FileSetParams, ResourceStore, Visibility, Work};
use deposit_events::Event;
use deposit_test_support::fixtures;

#[tokio::test]
async fn sequential_attachments_keep_attach_order() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let mut work = fixtures::work("Collected letters", Visibility::Open);

    let mut first = harness.actor(fixtures::titled_file_set("Page 1"), fixtures::depositor());
    let mut second = harness.actor(fixtures::titled_file_set("Page 2"), fixtures::depositor());
    let outcome = first
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;
    assert_eq!(
        outcome,
        AttachOutcome {
            work_saved: true,
            file_set_saved: true,
        }
    );
    second
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;

    let first_id = id_of(first.file_set())?;
    let second_id = id_of(second.file_set())?;
    assert_eq!(work.member_ids, vec![first_id, second_id]);

    let stored = harness.store.find_work(work.id).await?;
    assert_eq!(stored.member_ids, vec![first_id, second_id]);
    assert_eq!(stored.version, 2);
    Ok(())
}

#[tokio::test]
async fn first_attachment_becomes_representative_and_thumbnail() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let mut work = fixtures::work("Field notes", Visibility::Restricted);

    let mut first = harness.actor(fixtures::titled_file_set("Cover"), fixtures::depositor());
    first
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;
    let mut second = harness.actor(fixtures::titled_file_set("Back"), fixtures::depositor());
    second
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;

    let first_id = id_of(first.file_set())?;
    let stored = harness.store.find_work(work.id).await?;
    assert_eq!(stored.representative_id, Some(first_id));
    assert_eq!(stored.thumbnail_id, Some(first_id));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attachments_lose_no_members() -> anyhow::Result<()> {
    const ATTACHMENTS: usize = 8;

    let harness = Harness::new()?;
    let work = harness
        .store
        .save_work(&fixtures::work("Photo album", Visibility::Open))
        .await?;
    harness.store.delay_work_reads(Duration::from_millis(5));

    let mut tasks = Vec::with_capacity(ATTACHMENTS);
    for index in 0..ATTACHMENTS {
        let mut actor = harness.actor(
            fixtures::titled_file_set(&format!("Photo {index}")),
            fixtures::depositor(),
        );
        let mut copy = work.clone();
        tasks.push(tokio::spawn(async move {
            actor
                .attach_to_work(&mut copy, &FileSetParams::default())
                .await
                .map(|outcome| (outcome, actor.into_file_set()))
        }));
    }

    let mut attached = HashSet::new();
    for task in tasks {
        let (outcome, file_set) = task.await??;
        assert!(outcome.work_saved);
        attached.insert(id_of(&file_set)?);
    }

    let stored = harness.store.find_work(work.id).await?;
    assert_eq!(stored.member_ids.len(), ATTACHMENTS);
    let unique: HashSet<_> = stored.member_ids.iter().copied().collect();
    assert_eq!(unique, attached);
    assert_eq!(harness.services.metrics.snapshot().attachments_total, ATTACHMENTS as u64);
    assert_eq!(harness.services.locks.tracked_keys(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attachments_to_a_new_work_lose_no_members() -> anyhow::Result<()> {
    const ATTACHMENTS: usize = 4;

    let harness = Harness::new()?;
    let work = fixtures::work("Unsaved portfolio", Visibility::Open);
    harness.store.delay_work_reads(Duration::from_millis(5));

    let mut tasks = Vec::with_capacity(ATTACHMENTS);
    for index in 0..ATTACHMENTS {
        let mut actor = harness.actor(
            fixtures::titled_file_set(&format!("Sheet {index}")),
            fixtures::depositor(),
        );
        let mut copy = work.clone();
        tasks.push(tokio::spawn(async move {
            actor
                .attach_to_work(&mut copy, &FileSetParams::default())
                .await
        }));
    }
    for task in tasks {
        assert!(task.await??.work_saved);
    }

    let stored = harness.store.find_work(work.id).await?;
    assert_eq!(stored.member_ids.len(), ATTACHMENTS);
    assert_eq!(stored.version, ATTACHMENTS as u64);
    Ok(())
}

#[tokio::test]
async fn unlocked_writer_forces_a_reapply() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let work = harness
        .store
        .save_work(&fixtures::work("Sketches", Visibility::Open))
        .await?;
    harness.store.delay_work_reads(Duration::from_millis(100));

    let mut actor = harness.actor(fixtures::titled_file_set("Sketch"), fixtures::depositor());
    let mut copy = work.clone();
    let attach = tokio::spawn(async move {
        actor
            .attach_to_work(&mut copy, &FileSetParams::default())
            .await
            .map(|outcome| (outcome, actor.into_file_set()))
    });

    tokio::time::sleep(Duration::from_millis(30)).await;
    let mut retitled = harness.memory.find_work(work.id).await?;
    retitled.title = vec!["Sketches, revised".into()];
    harness.memory.save_work(&retitled).await?;

    let (outcome, file_set) = attach.await??;
    assert!(outcome.work_saved);
    let stored = harness.store.find_work(work.id).await?;
    assert_eq!(stored.member_ids, vec![id_of(&file_set)?]);
    assert_eq!(stored.title, vec!["Sketches, revised"]);
    assert_eq!(stored.version, 3);
    Ok(())
}

#[tokio::test]
async fn labelled_untitled_file_set_is_titled_on_attach() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let mut work = fixtures::work("Maps", Visibility::Open);
    let file_set = FileSet {
        label: Some("map-1890.tif".into()),
        ..FileSet::new()
    };

    let mut actor = harness.actor(file_set, fixtures::depositor());
    let outcome = actor
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;

    assert!(outcome.work_saved);
    let stored = harness.store.find_file_set(id_of(actor.file_set())?).await?;
    assert_eq!(stored.title, vec!["map-1890.tif"]);
    Ok(())
}

#[tokio::test]
async fn attaching_twice_appends_a_duplicate() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let mut work = fixtures::work("Minutes", Visibility::Open);
    let mut actor = harness.actor(fixtures::titled_file_set("Minutes"), fixtures::depositor());

    actor
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;
    actor
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;

    let id = id_of(actor.file_set())?;
    assert_eq!(harness.store.find_work(work.id).await?.member_ids, vec![id, id]);
    Ok(())
}

#[tokio::test]
async fn inherits_work_visibility_unless_assigned() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let mut work = fixtures::work("Survey", Visibility::Authenticated);

    let mut inherited = harness.actor(fixtures::titled_file_set("Data"), fixtures::depositor());
    inherited
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;
    assert_eq!(
        inherited.file_set().visibility,
        Some(Visibility::Authenticated)
    );

    let params = FileSetParams::with_visibility(Visibility::Restricted);
    let mut explicit = harness.actor(
        fixtures::titled_file_set("Codebook"),
        fixtures::depositor(),
    );
    assert!(explicit.create_metadata(&params).is_applied());
    explicit.attach_to_work(&mut work, &params).await?;
    assert_eq!(explicit.file_set().visibility, Some(Visibility::Restricted));

    let stored = harness
        .store
        .find_file_set(id_of(explicit.file_set())?)
        .await?;
    assert_eq!(stored.visibility, Some(Visibility::Restricted));
    Ok(())
}

#[tokio::test]
async fn lock_timeout_leaves_members_untouched() -> anyhow::Result<()> {
    let harness = Harness::with_lock_timeout(Duration::from_millis(20))?;
    let mut work = harness
        .store
        .save_work(&fixtures::work("Ledger", Visibility::Open))
        .await?;
    let recorded = harness.record_callbacks(CallbackEvent::AfterCreateFileset);

    let held = harness.services.locks.acquire(&work_key(work.id)).await?;
    let mut actor = harness.actor(fixtures::titled_file_set("Folio"), fixtures::depositor());
    let result = actor
        .attach_to_work(&mut work, &FileSetParams::default())
        .await;
    drop(held);

    assert!(matches!(result, Err(ActorError::LockTimeout { .. })));
    assert!(harness.store.find_work(work.id).await?.member_ids.is_empty());
    assert!(work.member_ids.is_empty());
    assert!(calls(&recorded).is_empty());
    assert_eq!(harness.services.metrics.snapshot().lock_timeouts, 1);
    Ok(())
}

#[tokio::test]
async fn rejected_work_save_is_reported_softly() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let mut work = fixtures::work("Drafts", Visibility::Open);
    harness.store.fail_work_saves(true);

    let mut actor = harness.actor(fixtures::titled_file_set("Draft"), fixtures::depositor());
    let outcome = actor
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;

    assert!(!outcome.work_saved);
    assert!(outcome.file_set_saved);
    assert!(work.member_ids.is_empty());
    assert!(
        !harness
            .events()
            .iter()
            .any(|event| matches!(event, Event::FileSetAttached { .. }))
    );
    assert_eq!(harness.services.metrics.snapshot().attachments_total, 0);
    Ok(())
}

#[tokio::test]
async fn deleted_work_is_not_found() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let mut work = Work {
        version: 3,
        ..fixtures::work("Withdrawn", Visibility::Open)
    };

    let mut actor = harness.actor(fixtures::titled_file_set("Orphan"), fixtures::depositor());
    let result = actor
        .attach_to_work(&mut work, &FileSetParams::default())
        .await;
    assert!(matches!(result, Err(ActorError::NotFound { kind: "work", .. })));
    Ok(())
}

#[tokio::test]
async fn attachment_runs_callback_and_publishes() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let recorded = harness.record_callbacks(CallbackEvent::AfterCreateFileset);
    let mut work = fixtures::work("Recordings", Visibility::Open);

    let mut actor = harness.actor(fixtures::titled_file_set("Track 1"), fixtures::depositor());
    actor
        .attach_to_work(&mut work, &FileSetParams::default())
        .await?;
    let id = id_of(actor.file_set())?;

    let seen = calls(&recorded);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].file_set_id, Some(id));
    assert_eq!(seen[0].user_key, fixtures::depositor().user_key);

    let attached: Vec<_> = harness
        .events()
        .into_iter()
        .filter_map(|event| match event {
            Event::FileSetAttached {
                file_set_id,
                work_id,
            } => Some((file_set_id, work_id)),
            _ => None,
        })
        .collect();
    assert_eq!(attached, vec![(id.as_uuid(), work.id.as_uuid())]);
    Ok(())
}
