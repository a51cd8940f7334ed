//! Notes store behavior against the local repository and a failing one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use notekeeper::guard::{HasherConfig, PasswordGuard};
use notekeeper::models::*;
use notekeeper::repository::{LocalRepository, NoteRepository};
use notekeeper::store::{Level, NotesStore};
use notekeeper::{NotesError, Result};
use tempfile::TempDir;
use uuid::Uuid;

fn fast_guard() -> PasswordGuard {
    PasswordGuard::new(HasherConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("Failed to build guard")
}

async fn setup() -> (NotesStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repo = LocalRepository::open(dir.path())
        .await
        .expect("Failed to open repository");
    let mut store = NotesStore::new(Box::new(repo), fast_guard());
    store.load().await.expect("Failed to load");
    (store, dir)
}

fn input(title: &str, content: &str) -> NoteInput {
    NoteInput::new(title, content)
}

/// Wraps a local repository and fails every call while `broken` is set.
struct FlakyRepository {
    inner: LocalRepository,
    broken: Arc<AtomicBool>,
}

impl FlakyRepository {
    fn check(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            Err(NotesError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NoteRepository for FlakyRepository {
    async fn list(&self) -> Result<Vec<Note>> {
        self.check()?;
        self.inner.list().await
    }

    async fn create(&self, note: NewNote) -> Result<Note> {
        self.check()?;
        self.inner.create(note).await
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        self.check()?;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.check()?;
        self.inner.delete(id).await
    }
}

async fn flaky_setup() -> (NotesStore, Arc<AtomicBool>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let inner = LocalRepository::open(dir.path())
        .await
        .expect("Failed to open repository");
    let broken = Arc::new(AtomicBool::new(false));
    let repo = FlakyRepository {
        inner,
        broken: broken.clone(),
    };
    (NotesStore::new(Box::new(repo), fast_guard()), broken, dir)
}

mod create {
    use super::*;

    #[tokio::test]
    async fn yields_fresh_note_with_equal_timestamps() {
        let (mut store, _dir) = setup().await;

        let a = store.create(input("A", "")).await.unwrap();
        let b = store.create(input("B", "")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(store.notes().len(), 2);
        assert_eq!(store.notes()[0].id, b.id);
    }

    #[tokio::test]
    async fn blank_title_fails_and_is_notified() {
        let (mut store, _dir) = setup().await;

        let result = store.create(input("   ", "content")).await;

        assert!(matches!(result, Err(NotesError::Validation(_))));
        assert!(store.notes().is_empty());
        let notes = store.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Error creating note");
        assert_eq!(notes[0].level, Level::Error);
    }

    #[tokio::test]
    async fn success_is_notified() {
        let (mut store, _dir) = setup().await;
        store.create(input("A", "")).await.unwrap();

        let notes = store.take_notifications();
        assert_eq!(notes[0].title, "Note created");
        assert_eq!(notes[0].level, Level::Info);
        assert!(store.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn blank_password_means_no_protection() {
        let (mut store, _dir) = setup().await;
        let mut form = input("A", "");
        form.password = Some("  ".to_string());

        let note = store.create(form).await.unwrap();

        assert!(note.password_hash.is_none());
        assert!(store.is_unlocked(note.id));
    }
}

mod search {
    use super::*;

    #[tokio::test]
    async fn groceries_scenario() {
        let (mut store, _dir) = setup().await;
        store.create(input("Older", "")).await.unwrap();
        let mut form = input("Groceries", "<p>milk</p>");
        assert!(form.add_tag("home"));
        assert!(!form.add_tag("home"));
        let groceries = store.create(form).await.unwrap();

        assert_eq!(store.visible_notes()[0].id, groceries.id);

        store.set_search_query("milk");
        let found = store.visible_notes();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, groceries.id);

        store.set_search_query("HOME");
        assert_eq!(store.visible_notes().len(), 1);

        store.set_search_query("bread");
        assert!(store.visible_notes().is_empty());

        store.set_search_query("");
        assert_eq!(store.visible_notes().len(), 2);
    }

    #[tokio::test]
    async fn pinned_notes_come_first() {
        let (mut store, _dir) = setup().await;
        let old = store.create(input("old", "")).await.unwrap();
        store.create(input("new", "")).await.unwrap();
        store.toggle_pin(old.id).await.unwrap();
        store.create(input("newest", "")).await.unwrap();

        let titles: Vec<_> = store.visible_notes().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["old", "newest", "new"]);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn changes_only_supplied_fields() {
        let (mut store, _dir) = setup().await;
        let mut form = input("Title", "Body");
        form.add_tag("a");
        let note = store.create(form).await.unwrap();

        let updated = store
            .update(
                note.id,
                UpdateNoteInput {
                    content: Some("New body".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.content, "New body");
        assert_eq!(updated.title, "Title");
        assert_eq!(updated.tags, vec!["a"]);
        assert!(updated.updated_at > note.updated_at);
        assert_eq!(store.get(note.id).unwrap(), &updated);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let (mut store, _dir) = setup().await;
        let note = store.create(input("Title", "")).await.unwrap();

        let result = store
            .update(
                note.id,
                UpdateNoteInput {
                    title: Some(String::new()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(NotesError::Validation(_))));
        assert_eq!(store.get(note.id).unwrap().title, "Title");
    }

    #[tokio::test]
    async fn missing_note_is_not_found() {
        let (mut store, _dir) = setup().await;

        let result = store
            .update(Uuid::new_v4(), UpdateNoteInput::default())
            .await;

        assert!(matches!(result, Err(NotesError::NotFound(_))));
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn removes_note_from_collection_and_storage() {
        let (mut store, dir) = setup().await;
        let note = store.create(input("gone", "")).await.unwrap();

        store.delete(note.id).await.unwrap();

        assert!(store.get(note.id).is_none());
        let reopened = LocalRepository::open(dir.path()).await.unwrap();
        assert!(reopened.list().await.unwrap().iter().all(|n| n.id != note.id));
    }

    #[tokio::test]
    async fn absent_note_counts_as_deleted() {
        let (mut store, _dir) = setup().await;

        assert!(store.delete(Uuid::new_v4()).await.is_ok());
    }
}

mod toggle_pin {
    use super::*;

    #[tokio::test]
    async fn twice_restores_flag_and_advances_timestamp() {
        let (mut store, _dir) = setup().await;
        let note = store.create(input("pin me", "")).await.unwrap();

        let once = store.toggle_pin(note.id).await.unwrap();
        let twice = store.toggle_pin(note.id).await.unwrap();

        assert!(once.is_pinned);
        assert!(!twice.is_pinned);
        assert!(once.updated_at > note.updated_at);
        assert!(twice.updated_at > once.updated_at);

        let titles: Vec<_> = store
            .take_notifications()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["Note created", "Note pinned", "Note unpinned"]);
    }

    #[tokio::test]
    async fn unknown_note_is_a_failed_no_op() {
        let (mut store, _dir) = setup().await;
        store.create(input("x", "")).await.unwrap();
        store.take_notifications();
        let before = store.notes().to_vec();

        let result = store.toggle_pin(Uuid::new_v4()).await;

        assert!(matches!(result, Err(NotesError::NotFound(_))));
        assert_eq!(store.notes(), before.as_slice());

        let notifications = store.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Error updating note");
        assert_eq!(notifications[0].level, Level::Error);
    }
}

mod passwords {
    use super::*;

    #[tokio::test]
    async fn protected_note_scenario() {
        let (mut store, _dir) = setup().await;
        let mut form = input("Diary", "<p>dear diary</p>");
        form.password = Some("abc123".to_string());

        let note = store.create(form).await.unwrap();

        let hash = note.password_hash.as_ref().expect("hash should be set");
        assert!(!hash.as_str().contains("abc123"));
        assert!(!serde_json::to_string(&note).unwrap().contains("abc123"));
        assert!(!format!("{:?}", note).contains(hash.as_str()));
        assert!(store.verify_password(note.id, "abc123").await.unwrap());
        assert!(!store.verify_password(note.id, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn content_is_gated_until_unlocked() {
        let (mut store, _dir) = setup().await;
        let mut form = input("Diary", "secret");
        form.password = Some("abc123".to_string());
        let note = store.create(form).await.unwrap();

        assert!(matches!(store.content(note.id), Err(NotesError::Locked(_))));
        assert!(store.summaries()[0].preview.is_empty());

        let wrong = store.unlock(note.id, "nope").await;
        assert!(matches!(wrong, Err(NotesError::Password)));
        assert!(!store.is_unlocked(note.id));

        store.unlock(note.id, "abc123").await.unwrap();
        assert_eq!(store.content(note.id).unwrap(), "secret");
        assert_eq!(store.summaries()[0].preview, "secret");

        store.lock(note.id);
        assert!(!store.is_unlocked(note.id));
    }

    #[tokio::test]
    async fn clearing_password_removes_protection() {
        let (mut store, _dir) = setup().await;
        let mut form = input("Diary", "secret");
        form.password = Some("abc123".to_string());
        let note = store.create(form).await.unwrap();

        let updated = store
            .update(
                note.id,
                UpdateNoteInput {
                    password: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.password_hash.is_none());
        assert!(store.verify_password(note.id, "anything").await.unwrap());
        assert_eq!(store.content(note.id).unwrap(), "secret");
    }

    #[tokio::test]
    async fn changing_password_relocks_the_note() {
        let (mut store, _dir) = setup().await;
        let mut form = input("Diary", "secret");
        form.password = Some("abc123".to_string());
        let note = store.create(form).await.unwrap();
        store.unlock(note.id, "abc123").await.unwrap();

        store
            .update(
                note.id,
                UpdateNoteInput {
                    password: Some("xyz789".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!store.is_unlocked(note.id));
        assert!(!store.verify_password(note.id, "abc123").await.unwrap());
        assert!(store.verify_password(note.id, "xyz789").await.unwrap());
    }

    #[tokio::test]
    async fn omitted_password_leaves_protection_alone() {
        let (mut store, _dir) = setup().await;
        let mut form = input("Diary", "secret");
        form.password = Some("abc123".to_string());
        let note = store.create(form).await.unwrap();

        let updated = store
            .update(
                note.id,
                UpdateNoteInput {
                    title: Some("Journal".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.password_hash, note.password_hash);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn failed_writes_leave_collection_untouched() {
        let (mut store, broken, _dir) = flaky_setup().await;
        let note = store.create(input("kept", "")).await.unwrap();
        let before = store.notes().to_vec();
        store.take_notifications();

        broken.store(true, Ordering::SeqCst);
        assert!(store.create(input("new", "")).await.is_err());
        assert!(store.toggle_pin(note.id).await.is_err());
        assert!(store
            .update(
                note.id,
                UpdateNoteInput {
                    title: Some("changed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .is_err());
        assert!(store.delete(note.id).await.is_err());

        assert_eq!(store.notes(), before.as_slice());
        let notifications = store.take_notifications();
        assert_eq!(notifications.len(), 4);
        assert!(notifications.iter().all(|n| n.level == Level::Error));
    }

    #[tokio::test]
    async fn failed_load_keeps_current_collection() {
        let (mut store, broken, _dir) = flaky_setup().await;
        store.create(input("kept", "")).await.unwrap();

        broken.store(true, Ordering::SeqCst);
        let result = store.refresh().await;

        assert!(matches!(result, Err(NotesError::Transport(_))));
        assert_eq!(store.notes().len(), 1);
        assert!(!store.is_loading());
    }
}
