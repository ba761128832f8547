//! End-to-end run through the store and gate: sample, persist, reload,
//! query with and without authorization.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{TimeZone, Utc};

use postrack::audit::{AuditSink, Notifier};
use postrack::gate::{AuthContext, Outcome, PlayerDirectory, QueryGate, ADMIN_ROLE};
use postrack::types::{GameMode, QueryRequest, Sample};
use postrack::PositionStore;

#[derive(Default, Clone)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl AuditSink for Recorder {
    fn append(&self, line: &str) {
        self.0.borrow_mut().push(line.to_owned());
    }
}

impl Notifier for Recorder {
    fn notify(&self, message: &str) {
        self.0.borrow_mut().push(message.to_owned());
    }
}

struct Directory(HashMap<String, String>);

impl PlayerDirectory for Directory {
    fn last_known_name(&self, uid: &str) -> Option<String> {
        self.0.get(uid).cloned()
    }
}

fn sample(uid: &str, x: f64) -> Sample {
    Sample {
        player_uid: uid.to_owned(),
        x,
        y: 64.0,
        z: 10.0,
        yaw: 0.0,
    }
}

#[test]
fn sampled_history_survives_a_restart_and_answers_queries() {
    let dir = tempfile::tempdir().unwrap();

    // a session's worth of sampling across two days
    let mut store = PositionStore::new();
    store.record_batch(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        &[sample("p1", 10.0), sample("p2", 50.0)],
    );
    store.record_batch(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 1, 0).unwrap(),
        &[sample("p1", 11.0)],
    );
    store.record_batch(
        Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
        &[sample("p2", 51.0)],
    );
    store.save_to_dir(dir.path()).unwrap();

    // next session starts from disk
    let mut store = PositionStore::new();
    store.load_from_dir(dir.path()).unwrap();
    assert_eq!(store.available_dates(), ["2024-01-01", "2024-01-02"]);

    let audit = Recorder::default();
    let notifications = Recorder::default();
    let gate = QueryGate::new(Box::new(audit.clone()), Some(Box::new(notifications.clone())));
    let directory = Directory(HashMap::from([("p1".to_owned(), "Alice".to_owned())]));
    let admin = AuthContext {
        role: ADMIN_ROLE.to_owned(),
        mode: GameMode::Creative,
    };

    // discover the dates first, the way a map client does
    let outcome = gate.handle("op", "Operator", &admin, &QueryRequest::default(), &store, &directory);
    let Outcome::Granted(response) = outcome else { panic!("expected a grant") };
    assert_eq!(response.available_dates, ["2024-01-01", "2024-01-02"]);
    assert!(response.records.is_empty());

    // then pull one day filtered to one player
    let request = QueryRequest {
        date: "2024-01-01".to_owned(),
        player_filter: "p1".to_owned(),
    };
    let outcome = gate.handle("op", "Operator", &admin, &request, &store, &directory);
    let Outcome::Granted(response) = outcome else { panic!("expected a grant") };
    assert_eq!(response.records.len(), 2);
    assert!(response.records.iter().all(|r| r.player_uid == "p1"));
    assert_eq!(response.records[0].x, 10.0);
    assert_eq!(response.records[1].x, 11.0);
    assert_eq!(response.player_names, HashMap::from([("p1".to_owned(), "Alice".to_owned())]));

    assert_eq!(
        audit.lines(),
        [
            "Operator requested available dates for all players",
            "Operator requested date 2024-01-01 for player Alice",
        ]
    );
    assert_eq!(notifications.lines(), audit.lines());
}

#[test]
fn the_gate_stays_shut_for_everyone_else() {
    let mut store = PositionStore::new();
    store.record_batch(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        &[sample("p1", 10.0)],
    );

    let audit = Recorder::default();
    let gate = QueryGate::new(Box::new(audit.clone()), None);
    let directory = Directory(HashMap::new());
    let request = QueryRequest {
        date: "2024-01-01".to_owned(),
        player_filter: String::new(),
    };

    for (role, mode) in [
        ("player", GameMode::Creative),
        (ADMIN_ROLE, GameMode::Survival),
        ("player", GameMode::Survival),
    ] {
        let ctx = AuthContext { role: role.to_owned(), mode };
        let outcome = gate.handle("u9", "Mallory", &ctx, &request, &store, &directory);
        assert!(matches!(outcome, Outcome::Denied));
    }
    assert!(audit.lines().is_empty());
}
