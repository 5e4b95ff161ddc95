mod helpers;

use context_tree::backend::{ChatMessage, Role};
use context_tree::error::BackendError;
use context_tree::tree::ContextTree;
use context_tree::turn::{build_messages, run_turn, TurnError, TurnOutcome, TurnSettings};
use helpers::{branched_tree, ScriptedBackend};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn completed_stream_commits_one_node() {
    let mut tree = ContextTree::new();
    let backend = ScriptedBackend::replying(&["Hel", "lo", "!"]);
    let cancel = CancellationToken::new();
    let mut seen = Vec::new();

    let settings = TurnSettings::new("test-model");
    let outcome = run_turn(&mut tree, &backend, settings, "hi", &cancel, |c| {
        seen.push(c.to_string())
    })
    .await
    .unwrap();

    let TurnOutcome::Committed(id) = outcome else {
        panic!("expected a committed turn");
    };
    let node = tree.get(id).unwrap();
    assert_eq!(node.prompt, "hi");
    assert_eq!(node.response, "Hello!");
    assert_eq!(node.model, "test-model");
    assert_eq!(node.sequence, 1);
    assert_eq!(tree.current_id(), id);
    assert_eq!(seen, vec!["Hel", "lo", "!"]);
}

#[tokio::test]
async fn new_turn_branches_from_the_current_position() {
    let (mut tree, [one, two, three]) = branched_tree();
    tree.move_to(one).unwrap();
    let backend = ScriptedBackend::replying(&["Spain is nice"]);

    let cancel = CancellationToken::new();
    let outcome = run_turn(&mut tree, &backend, TurnSettings::new("m"), "Spain?", &cancel, |_| {})
        .await
        .unwrap();

    let TurnOutcome::Committed(id) = outcome else {
        panic!("expected a committed turn");
    };
    let children: Vec<_> = tree.store().children(one).unwrap().iter().map(|n| n.id).collect();
    assert_eq!(children, vec![two, three, id]);
    assert_eq!(tree.label(id).unwrap(), "4 (1.3)");
}

#[tokio::test]
async fn backend_error_mid_stream_creates_nothing() {
    let (mut tree, _) = branched_tree();
    let before = tree.clone();
    let backend =
        ScriptedBackend::failing_after(&["partial "], BackendError::Failed("model crashed".into()));

    let cancel = CancellationToken::new();
    let err = run_turn(&mut tree, &backend, TurnSettings::new("m"), "go on", &cancel, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Backend(BackendError::Failed(_))));
    assert_eq!(tree, before);
}

#[tokio::test]
async fn unavailable_backend_creates_nothing() {
    let (mut tree, _) = branched_tree();
    let before = tree.clone();
    let backend = ScriptedBackend::unavailable();

    let cancel = CancellationToken::new();
    let err = run_turn(&mut tree, &backend, TurnSettings::new("m"), "hello?", &cancel, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Backend(BackendError::Unavailable(_))));
    assert_eq!(tree, before);
}

#[tokio::test]
async fn cancelling_mid_stream_discards_the_partial_response() {
    let (mut tree, _) = branched_tree();
    let position = tree.current_id();
    let count = tree.store().len();
    let backend = ScriptedBackend::hanging_after(&["one ", "two "]);
    let cancel = CancellationToken::new();

    let outcome = {
        let cancel_on_second = cancel.clone();
        let mut received = 0;
        run_turn(&mut tree, &backend, TurnSettings::new("m"), "count", &cancel, move |_| {
            received += 1;
            if received == 2 {
                cancel_on_second.cancel();
            }
        })
        .await
        .unwrap()
    };

    assert_eq!(outcome, TurnOutcome::Cancelled { partial: "one two ".into() });
    assert_eq!(tree.current_id(), position);
    assert_eq!(tree.store().len(), count);
}

#[tokio::test]
async fn cancelling_before_the_request_does_nothing() {
    let mut tree = ContextTree::new();
    let backend = ScriptedBackend::replying(&["never seen"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = run_turn(&mut tree, &backend, TurnSettings::new("m"), "hi", &cancel, |_| {})
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Cancelled { partial: String::new() });
    assert_eq!(tree.turn_count(), 0);
}

#[test]
fn messages_follow_the_current_branch_only() {
    let (tree, _) = branched_tree();
    let messages = build_messages(&tree, None, "and the food?").unwrap();

    assert_eq!(
        messages,
        vec![
            ChatMessage::user("plan a trip"),
            ChatMessage::assistant("where to?"),
            ChatMessage::user("Portugal"),
            ChatMessage::assistant("also great"),
            ChatMessage::user("and the food?"),
        ]
    );
    assert_eq!(messages[0].role, Role::User);
}

#[test]
fn system_message_leads_the_conversation() {
    let (tree, _) = branched_tree();
    let messages = build_messages(&tree, Some("answer in French"), "and the food?").unwrap();

    assert_eq!(messages.len(), 6);
    assert_eq!(messages[0], ChatMessage::system("answer in French"));
    assert_eq!(messages[1], ChatMessage::user("plan a trip"));
    assert!(messages[1..].iter().all(|m| m.role != Role::System));
}

#[tokio::test]
async fn system_message_reaches_the_backend_but_not_the_tree() {
    let mut tree = ContextTree::new();
    let backend = ScriptedBackend::replying(&["Bonjour"]);
    let settings = TurnSettings::new("m").with_system(Some("answer in French"));

    let cancel = CancellationToken::new();
    let outcome = run_turn(&mut tree, &backend, settings, "hi", &cancel, |_| {})
        .await
        .unwrap();

    let TurnOutcome::Committed(id) = outcome else {
        panic!("expected a committed turn");
    };
    let sent = backend.last_request();
    assert_eq!(sent.first(), Some(&ChatMessage::system("answer in French")));
    assert_eq!(sent.last(), Some(&ChatMessage::user("hi")));
    assert_eq!(tree.get(id).unwrap().prompt, "hi");
    assert_eq!(tree.turn_count(), 1);
}
