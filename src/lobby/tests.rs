use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::game::{Lobby, LobbyEvent, Phase, ReviewAssignment};

use super::broadcast::Broadcaster;
use super::error::LobbyError;
use super::service::{LobbyCoordinator, LobbyService};
use super::storage::{InMemoryLobbyStore, LobbyStore};

#[derive(Clone, Debug)]
enum Published {
    State(Lobby),
    Review(ReviewAssignment),
}

#[derive(Default)]
struct RecordingBroadcaster {
    published: Mutex<Vec<Published>>,
}

impl RecordingBroadcaster {
    fn count(&self) -> usize {
        self.published.lock().len()
    }

    fn review_assignments(&self) -> Vec<ReviewAssignment> {
        self.published
            .lock()
            .iter()
            .filter_map(|p| match p {
                Published::Review(assignment) => Some(assignment.clone()),
                Published::State(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn publish_state(&self, _lobby: &str, snapshot: &Lobby) -> Result<(), LobbyError> {
        self.published
            .lock()
            .push(Published::State(snapshot.clone()));
        Ok(())
    }

    async fn publish_review_assignment(
        &self,
        _lobby: &str,
        assignment: &ReviewAssignment,
    ) -> Result<(), LobbyError> {
        self.published
            .lock()
            .push(Published::Review(assignment.clone()));
        Ok(())
    }
}

struct Fixture {
    service: LobbyCoordinator,
    store: Arc<InMemoryLobbyStore>,
    broadcasts: Arc<RecordingBroadcaster>,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryLobbyStore::new());
    let broadcasts = Arc::new(RecordingBroadcaster::default());
    let service = LobbyCoordinator::new(store.clone(), broadcasts.clone());
    Fixture {
        service,
        store,
        broadcasts,
    }
}

async fn persisted(store: &InMemoryLobbyStore, lobby: &str) -> Lobby {
    store
        .load_lobby(lobby)
        .await
        .unwrap()
        .expect("lobby should be persisted")
}

async fn ready_all(service: &LobbyCoordinator, members: &[(Uuid, &str)]) {
    for (session, name) in members {
        service
            .handle_event(
                *session,
                LobbyEvent::SetReady {
                    player: (*name).to_string(),
                    ready: true,
                },
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn join_creates_lobby_with_creator_as_owner() {
    let fx = fixture();
    let session = Uuid::new_v4();
    let snapshot = fx
        .service
        .join_lobby("quiz", "ana", session, "#f00")
        .await
        .unwrap();

    assert_eq!(snapshot.owner, "ana");
    assert_eq!(snapshot.phase, Phase::Guess);
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(fx.broadcasts.count(), 1);
    assert_eq!(persisted(&fx.store, "quiz").await, snapshot);
}

#[tokio::test]
async fn rejoin_attaches_instead_of_duplicating() {
    let fx = fixture();
    fx.service
        .join_lobby("quiz", "ana", Uuid::new_v4(), "#f00")
        .await
        .unwrap();

    let new_session = Uuid::new_v4();
    let snapshot = fx
        .service
        .join_lobby("quiz", "ana", new_session, "#f00")
        .await
        .unwrap();

    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.player("ana").unwrap().session, new_session);
    assert_eq!(
        fx.service.session_binding(new_session).unwrap().player,
        "ana"
    );
}

#[tokio::test]
async fn illegal_event_neither_mutates_nor_broadcasts() {
    let fx = fixture();
    let ana = Uuid::new_v4();
    fx.service.join_lobby("quiz", "ana", ana, "#f00").await.unwrap();
    let bo = Uuid::new_v4();
    fx.service.join_lobby("quiz", "bo", bo, "#0f0").await.unwrap();
    ready_all(&fx.service, &[(ana, "ana"), (bo, "bo")]).await;
    assert_eq!(persisted(&fx.store, "quiz").await.phase, Phase::Watch);

    let before = serde_json::to_vec(&persisted(&fx.store, "quiz").await).unwrap();
    let broadcasts_before = fx.broadcasts.count();

    // Submitting is only legal in the guess phase.
    fx.service
        .handle_event(
            ana,
            LobbyEvent::SubmitGuess {
                player: "ana".into(),
                text: "too late".into(),
            },
        )
        .await
        .unwrap();

    let after = serde_json::to_vec(&persisted(&fx.store, "quiz").await).unwrap();
    assert_eq!(before, after, "persisted state must be byte-for-byte unchanged");
    assert_eq!(fx.broadcasts.count(), broadcasts_before);
}

#[tokio::test]
async fn non_owner_tick_is_ignored_at_the_service_boundary() {
    let fx = fixture();
    let ana = Uuid::new_v4();
    let bo = Uuid::new_v4();
    fx.service.join_lobby("quiz", "ana", ana, "#f00").await.unwrap();
    fx.service.join_lobby("quiz", "bo", bo, "#0f0").await.unwrap();
    fx.service
        .handle_event(
            ana,
            LobbyEvent::SubmitGuess {
                player: "ana".into(),
                text: "a toast is raised".into(),
            },
        )
        .await
        .unwrap();
    ready_all(&fx.service, &[(ana, "ana"), (bo, "bo")]).await;

    let broadcasts_before = fx.broadcasts.count();
    // bo's session tries to tick ana's guess.
    fx.service
        .handle_event(
            bo,
            LobbyEvent::TickGuess {
                player: "ana".into(),
                text: "a toast is raised".into(),
            },
        )
        .await
        .unwrap();

    let lobby = persisted(&fx.store, "quiz").await;
    assert!(!lobby.player("ana").unwrap().guesses[0].ticked);
    assert_eq!(fx.broadcasts.count(), broadcasts_before);
}

#[tokio::test]
async fn end_watch_phase_publishes_one_derangement() {
    let fx = fixture();
    let sessions: Vec<(Uuid, &str)> = vec![
        (Uuid::new_v4(), "ana"),
        (Uuid::new_v4(), "bo"),
        (Uuid::new_v4(), "cy"),
    ];
    for (session, name) in &sessions {
        fx.service
            .join_lobby("quiz", name, *session, "#ccc")
            .await
            .unwrap();
    }
    ready_all(&fx.service, &sessions).await;

    fx.service
        .handle_event(sessions[0].0, LobbyEvent::EndWatchPhase)
        .await
        .unwrap();

    assert_eq!(persisted(&fx.store, "quiz").await.phase, Phase::Review);
    let assignments = fx.broadcasts.review_assignments();
    assert_eq!(assignments.len(), 1);
    let assignment = &assignments[0];
    assert_eq!(assignment.len(), 3);
    for (reviewer, reviewee) in assignment {
        assert_ne!(reviewer, &reviewee.name);
    }

    // The trigger is idempotent: no second assignment.
    fx.service
        .handle_event(sessions[0].0, LobbyEvent::EndWatchPhase)
        .await
        .unwrap();
    assert_eq!(fx.broadcasts.review_assignments().len(), 1);
}

#[tokio::test]
async fn end_watch_phase_with_lone_player_fails_loudly_without_stranding() {
    let fx = fixture();
    let solo = Uuid::new_v4();
    fx.service
        .join_lobby("quiz", "solo", solo, "#f0f")
        .await
        .unwrap();
    ready_all(&fx.service, &[(solo, "solo")]).await;
    assert_eq!(persisted(&fx.store, "quiz").await.phase, Phase::Watch);

    let err = fx
        .service
        .handle_event(solo, LobbyEvent::EndWatchPhase)
        .await
        .unwrap_err();
    assert!(matches!(err, LobbyError::InvariantViolation(_)));

    // The failed transition must not have been persisted.
    assert_eq!(persisted(&fx.store, "quiz").await.phase, Phase::Watch);
    assert!(fx.broadcasts.review_assignments().is_empty());
}

#[tokio::test]
async fn unknown_session_is_reported_not_ignored() {
    let fx = fixture();
    let err = fx
        .service
        .handle_event(Uuid::new_v4(), LobbyEvent::Reset)
        .await
        .unwrap_err();
    assert!(matches!(err, LobbyError::NotFound("session")));
}

#[tokio::test]
async fn disconnect_keeps_player_on_roster_and_in_unanimity() {
    let fx = fixture();
    let ana = Uuid::new_v4();
    let bo = Uuid::new_v4();
    fx.service.join_lobby("quiz", "ana", ana, "#f00").await.unwrap();
    fx.service.join_lobby("quiz", "bo", bo, "#0f0").await.unwrap();

    fx.service.disconnect(bo);
    // Unknown sessions are fine too.
    fx.service.disconnect(Uuid::new_v4());

    assert!(fx.service.session_binding(bo).is_none());
    let lobby = persisted(&fx.store, "quiz").await;
    assert!(lobby.contains_player("bo"));

    // bo still blocks unanimity even while detached.
    ready_all(&fx.service, &[(ana, "ana")]).await;
    assert_eq!(persisted(&fx.store, "quiz").await.phase, Phase::Guess);
}

#[tokio::test]
async fn reset_clears_round_state_from_any_phase() {
    let fx = fixture();
    let ana = Uuid::new_v4();
    let bo = Uuid::new_v4();
    fx.service.join_lobby("quiz", "ana", ana, "#f00").await.unwrap();
    fx.service.join_lobby("quiz", "bo", bo, "#0f0").await.unwrap();
    fx.service
        .handle_event(
            ana,
            LobbyEvent::SubmitGuess {
                player: "ana".into(),
                text: "an encore happens".into(),
            },
        )
        .await
        .unwrap();
    ready_all(&fx.service, &[(ana, "ana"), (bo, "bo")]).await;
    fx.service
        .handle_event(ana, LobbyEvent::EndWatchPhase)
        .await
        .unwrap();

    fx.service.handle_event(ana, LobbyEvent::Reset).await.unwrap();

    let lobby = persisted(&fx.store, "quiz").await;
    assert_eq!(lobby.phase, Phase::Guess);
    for player in &lobby.players {
        assert!(player.guesses.is_empty());
        assert!(!player.ready);
        assert!(!player.reviewed);
    }
}

#[tokio::test]
async fn snapshot_of_unknown_lobby_is_not_found() {
    let fx = fixture();
    let err = fx.service.snapshot("nowhere").await.unwrap_err();
    assert!(matches!(err, LobbyError::NotFound("lobby")));
}
