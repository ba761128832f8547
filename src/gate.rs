use std::collections::HashMap;

use crate::audit::{AuditSink, Notifier};
use crate::store::PositionStore;
use crate::types::{GameMode, PositionRecord, QueryRequest, QueryResponse, ALL_PLAYERS};

pub const ADMIN_ROLE: &str = "admin";

/// Role code and game mode of a requester at the moment of the request.
/// Built fresh from live session state for every query, never cached.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub role: String,
    pub mode: GameMode,
}

/// Authorization policy over a request context. A plain function so a
/// stricter policy can be swapped in without touching the gate's control
/// flow.
pub type Policy = fn(&AuthContext) -> bool;

/// Default policy: operators in creative mode only.
pub fn admin_creative(ctx: &AuthContext) -> bool {
    ctx.role == ADMIN_ROLE && ctx.mode == GameMode::Creative
}

/// Resolves a stable player uid to a last-known display name.
pub trait PlayerDirectory {
    fn last_known_name(&self, uid: &str) -> Option<String>;
}

#[derive(Debug)]
pub enum Outcome {
    Granted(QueryResponse),
    /// Expected, non-exceptional refusal. The requester gets nothing, not
    /// even a refusal message on the wire.
    Denied,
}

/// Authorization and audit in front of the position store.
pub struct QueryGate {
    policy: Policy,
    audit: Box<dyn AuditSink>,
    notifier: Option<Box<dyn Notifier>>,
}

impl QueryGate {
    pub fn new(audit: Box<dyn AuditSink>, notifier: Option<Box<dyn Notifier>>) -> Self {
        Self {
            policy: admin_creative,
            audit,
            notifier,
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn authorizes(&self, ctx: &AuthContext) -> bool {
        (self.policy)(ctx)
    }

    /// Answers one query, or refuses it.
    ///
    /// A denial logs a warning and does nothing else: no directory lookup,
    /// no audit line, no notification. A grant always produces exactly one
    /// audit line, forwarded to the notifier when one is configured.
    pub fn handle(
        &self,
        requester_uid: &str,
        requester_name: &str,
        ctx: &AuthContext,
        request: &QueryRequest,
        store: &PositionStore,
        directory: &dyn PlayerDirectory,
    ) -> Outcome {
        if !(self.policy)(ctx) {
            log::warn!("unauthorized position data request from {requester_name} ({requester_uid})");
            return Outcome::Denied;
        }

        let available_dates = store.available_dates();
        let mut records: Vec<PositionRecord> = if request.date.is_empty() {
            vec![]
        } else {
            store.records_for(&request.date).to_vec()
        };
        if !unfiltered(&request.player_filter) {
            records.retain(|r| r.player_uid == request.player_filter);
        }

        let mut player_names = HashMap::new();
        for record in &records {
            if !player_names.contains_key(&record.player_uid) {
                let name = directory
                    .last_known_name(&record.player_uid)
                    .unwrap_or_else(|| record.player_uid.clone());
                player_names.insert(record.player_uid.clone(), name);
            }
        }

        let date_info = if request.date.is_empty() {
            "available dates".to_owned()
        } else {
            format!("date {}", request.date)
        };
        let filter_info = if unfiltered(&request.player_filter) {
            "all players".to_owned()
        } else {
            let name = directory
                .last_known_name(&request.player_filter)
                .unwrap_or_else(|| request.player_filter.clone());
            format!("player {name}")
        };
        let line = format!("{requester_name} requested {date_info} for {filter_info}");
        self.audit.append(&line);
        if let Some(notifier) = &self.notifier {
            notifier.notify(&line);
        }

        Outcome::Granted(QueryResponse {
            available_dates,
            records,
            player_names,
        })
    }
}

fn unfiltered(player_filter: &str) -> bool {
    player_filter.is_empty() || player_filter == ALL_PLAYERS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

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

    /// Directory that must not be consulted.
    struct NoDirectory;

    impl PlayerDirectory for NoDirectory {
        fn last_known_name(&self, uid: &str) -> Option<String> {
            panic!("directory consulted for {uid}");
        }
    }

    struct Names(Vec<(&'static str, &'static str)>);

    impl PlayerDirectory for Names {
        fn last_known_name(&self, uid: &str) -> Option<String> {
            self.0
                .iter()
                .find(|(known, _)| *known == uid)
                .map(|(_, name)| (*name).to_owned())
        }
    }

    fn seeded_store() -> PositionStore {
        let mut store = PositionStore::new();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        store.record_batch(
            t,
            &[
                Sample { player_uid: "p1".into(), x: 10.0, y: 64.0, z: 10.0, yaw: 0.0 },
                Sample { player_uid: "p2".into(), x: 20.0, y: 64.0, z: 20.0, yaw: 0.0 },
            ],
        );
        store
    }

    fn gate() -> (QueryGate, Rc<RefCell<Vec<String>>>, Rc<RefCell<Vec<String>>>) {
        let audited = Rc::new(RefCell::new(vec![]));
        let notified = Rc::new(RefCell::new(vec![]));
        let gate = QueryGate::new(
            Box::new(Recorder(audited.clone())),
            Some(Box::new(Recorder(notified.clone()))),
        );
        (gate, audited, notified)
    }

    fn admin() -> AuthContext {
        AuthContext { role: ADMIN_ROLE.to_owned(), mode: GameMode::Creative }
    }

    #[test]
    fn policy_requires_both_role_and_mode() {
        assert!(admin_creative(&admin()));
        assert!(!admin_creative(&AuthContext { role: ADMIN_ROLE.into(), mode: GameMode::Survival }));
        assert!(!admin_creative(&AuthContext { role: "player".into(), mode: GameMode::Creative }));
    }

    #[test]
    fn denied_requests_touch_nothing() {
        let store = seeded_store();
        let (gate, audited, notified) = gate();
        let ctx = AuthContext { role: "player".into(), mode: GameMode::Creative };
        for request in [
            QueryRequest::default(),
            QueryRequest { date: "2024-01-01".into(), player_filter: String::new() },
            QueryRequest { date: "2024-01-01".into(), player_filter: "p1".into() },
        ] {
            let outcome = gate.handle("u1", "mallory", &ctx, &request, &store, &NoDirectory);
            assert!(matches!(outcome, Outcome::Denied));
        }
        assert!(audited.borrow().is_empty());
        assert!(notified.borrow().is_empty());
    }

    #[test]
    fn empty_date_lists_dates_only() {
        let store = seeded_store();
        let (gate, audited, _) = gate();
        let outcome = gate.handle("u1", "alice", &admin(), &QueryRequest::default(), &store, &Names(vec![]));
        let Outcome::Granted(response) = outcome else { panic!("expected a grant") };
        assert_eq!(response.available_dates, ["2024-01-01"]);
        assert!(response.records.is_empty());
        assert!(response.player_names.is_empty());
        assert_eq!(audited.borrow()[0], "alice requested available dates for all players");
    }

    #[test]
    fn player_filter_keeps_only_that_uid() {
        let store = seeded_store();
        let (gate, audited, notified) = gate();
        let request = QueryRequest { date: "2024-01-01".into(), player_filter: "p1".into() };
        let outcome = gate.handle("u1", "alice", &admin(), &request, &store, &Names(vec![("p1", "Bob")]));
        let Outcome::Granted(response) = outcome else { panic!("expected a grant") };
        assert_eq!(response.records.len(), 1);
        assert_eq!(response.records[0].player_uid, "p1");
        assert_eq!(response.player_names.len(), 1);
        assert_eq!(response.player_names["p1"], "Bob");
        assert_eq!(audited.borrow()[0], "alice requested date 2024-01-01 for player Bob");
        assert_eq!(notified.borrow().as_slice(), audited.borrow().as_slice());
    }

    #[test]
    fn sentinel_filter_means_everyone() {
        let store = seeded_store();
        let (gate, audited, _) = gate();
        let request = QueryRequest { date: "2024-01-01".into(), player_filter: ALL_PLAYERS.into() };
        let outcome = gate.handle("u1", "alice", &admin(), &request, &store, &Names(vec![]));
        let Outcome::Granted(response) = outcome else { panic!("expected a grant") };
        assert_eq!(response.records.len(), 2);
        assert!(audited.borrow()[0].ends_with("for all players"));
    }

    #[test]
    fn unknown_uids_fall_back_to_the_uid_itself() {
        let store = seeded_store();
        let (gate, audited, _) = gate();
        let request = QueryRequest { date: "2024-01-01".into(), player_filter: "p2".into() };
        let outcome = gate.handle("u1", "alice", &admin(), &request, &store, &Names(vec![("p1", "Bob")]));
        let Outcome::Granted(response) = outcome else { panic!("expected a grant") };
        assert_eq!(response.player_names["p2"], "p2");
        assert_eq!(audited.borrow()[0], "alice requested date 2024-01-01 for player p2");
    }

    #[test]
    fn unknown_date_grants_an_empty_day() {
        let store = seeded_store();
        let (gate, _, _) = gate();
        let request = QueryRequest { date: "1999-09-09".into(), player_filter: String::new() };
        let outcome = gate.handle("u1", "alice", &admin(), &request, &store, &Names(vec![]));
        let Outcome::Granted(response) = outcome else { panic!("expected a grant") };
        assert!(response.records.is_empty());
        assert_eq!(response.available_dates, ["2024-01-01"]);
    }

    #[test]
    fn notifier_is_optional() {
        let store = seeded_store();
        let audited = Rc::new(RefCell::new(vec![]));
        let gate = QueryGate::new(Box::new(Recorder(audited.clone())), None);
        let outcome = gate.handle("u1", "alice", &admin(), &QueryRequest::default(), &store, &Names(vec![]));
        assert!(matches!(outcome, Outcome::Granted(_)));
        assert_eq!(audited.borrow().len(), 1);
    }

    #[test]
    fn custom_policy_replaces_the_default() {
        let store = seeded_store();
        let (gate, audited, _) = gate();
        let gate = gate.with_policy(|_| false);
        let outcome = gate.handle("u1", "alice", &admin(), &QueryRequest::default(), &store, &NoDirectory);
        assert!(matches!(outcome, Outcome::Denied));
        assert!(audited.borrow().is_empty());
    }
}
