// Convergence property for the raw-offset sync model: two clients that
// receive the same change stream in the same delivery order end up with
// identical document bodies, and a client never reapplies its own echoed
// changes.

use draftsync_common::types::{Collaborator, CollaboratorRole, ContentChange};
use draftsync_engine::channel::MpscChannel;
use draftsync_engine::engine::CollabEngine;
use draftsync_engine::propagation::apply_change;
use proptest::prelude::*;
use uuid::Uuid;

const SEED_BODY: &str = "Launch day is coming soon";

/// Raw op material; positions and lengths are made valid against the
/// evolving body when the stream is built.
#[derive(Debug, Clone)]
enum RawOp {
    Insert { seed: usize, text: String },
    Delete { seed: usize, len_seed: usize },
}

fn raw_op() -> impl Strategy<Value = RawOp> {
    prop_oneof![
        ("[a-z #!]{1,8}", any::<usize>())
            .prop_map(|(text, seed)| RawOp::Insert { seed, text }),
        (any::<usize>(), any::<usize>())
            .prop_map(|(seed, len_seed)| RawOp::Delete { seed, len_seed }),
    ]
}

/// Turn raw ops into an always-valid change stream from one remote author,
/// folding a reference body alongside.
fn build_stream(author: &str, raw: Vec<RawOp>) -> (Vec<ContentChange>, String) {
    let mut body = SEED_BODY.to_string();
    let mut stream = Vec::with_capacity(raw.len());

    for op in raw {
        let len = body.chars().count();
        let change = match op {
            RawOp::Insert { seed, text } => {
                let position = (seed % (len + 1)) as i64;
                ContentChange::insert(author, author, position, text)
            }
            RawOp::Delete { seed, len_seed } => {
                if len == 0 {
                    continue;
                }
                let position = seed % len;
                let max_len = len - position;
                let length = (len_seed % max_len) + 1;
                ContentChange::delete(author, author, position as i64, length as i64)
            }
        };
        body = apply_change(&body, &change).expect("generated change should be valid");
        stream.push(change);
    }
    (stream, body)
}

fn observer(id: &str) -> (CollabEngine<MpscChannel>, Uuid) {
    let (channel, _out) = MpscChannel::pair();
    let mut engine = CollabEngine::new(
        Collaborator::new(id, id, format!("{id}@example.com"), CollaboratorRole::Editor),
        channel,
    );
    let session_id = engine
        .start_session("draft-1", "Launch post", "twitter", SEED_BODY, vec![])
        .expect("session should start");
    (engine, session_id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn same_ordered_stream_converges_on_all_recipients(raw in prop::collection::vec(raw_op(), 1..40)) {
        let (stream, expected) = build_stream("user-author", raw);

        let (mut first, first_session) = observer("obs-one");
        let (mut second, second_session) = observer("obs-two");

        for change in &stream {
            first.receive_remote_change(first_session, change.clone()).expect("first applies");
            second.receive_remote_change(second_session, change.clone()).expect("second applies");
        }

        let first_body = &first.document(first_session).expect("document").body;
        let second_body = &second.document(second_session).expect("document").body;
        prop_assert_eq!(first_body, second_body);
        prop_assert_eq!(first_body, &expected);
    }

    #[test]
    fn own_authored_changes_in_the_stream_are_never_reapplied(raw in prop::collection::vec(raw_op(), 1..20)) {
        // Every change in this stream claims the observer as its author, so
        // echo suppression must drop all of them.
        let (stream, _) = build_stream("obs-one", raw);
        let (mut engine, session_id) = observer("obs-one");

        for change in stream {
            engine.receive_remote_change(session_id, change).expect("echo accepted");
        }

        prop_assert_eq!(&engine.document(session_id).expect("document").body, SEED_BODY);
    }
}
