mod helpers;

use context_tree::error::SessionError;
use context_tree::session;
use context_tree::tree::ContextTree;
use helpers::{branched_tree, linear_turns, temp_sessions};

#[test]
fn round_trip_without_tags() {
    let (_dir, store) = temp_sessions();
    let (tree, _) = branched_tree();

    store.save(&tree, Some("trip")).unwrap();
    let loaded = store.load("trip").unwrap();

    assert_eq!(loaded, tree);
    assert!(loaded.recent_tags().is_empty());
}

#[test]
fn round_trip_with_one_tag() {
    let (_dir, store) = temp_sessions();
    let (mut tree, [one, _, _]) = branched_tree();
    tree.set_tag(one, "start").unwrap();

    store.save(&tree, Some("trip")).unwrap();
    let loaded = store.load("trip.json").unwrap();

    assert_eq!(loaded, tree);
    assert_eq!(loaded.recent_tags(), vec!["start"]);
    assert_eq!(loaded.get(one).unwrap().tag.as_deref(), Some("start"));
}

#[test]
fn round_trip_with_many_tags() {
    let (_dir, store) = temp_sessions();
    let mut tree = ContextTree::new();
    let ids = linear_turns(&mut tree, 7);
    for (i, id) in ids.iter().enumerate() {
        tree.set_tag(*id, &format!("tag-{i}")).unwrap();
    }
    tree.move_to(ids[2]).unwrap();

    store.save(&tree, Some("long")).unwrap();
    let loaded = store.load("long").unwrap();

    assert_eq!(loaded, tree);
    assert_eq!(loaded.current_id(), ids[2]);
    assert_eq!(loaded.recent_tags().len(), 5);
    assert_eq!(loaded.recent_tags()[0], "tag-6");
}

#[test]
fn loaded_tree_keeps_growing_from_the_saved_position() {
    let (_dir, store) = temp_sessions();
    let (tree, [_, _, three]) = branched_tree();
    store.save(&tree, Some("trip")).unwrap();

    let mut loaded = store.load("trip").unwrap();
    let next = loaded.append_turn("Porto?", "sure", "m").unwrap();

    assert_eq!(loaded.get(next).unwrap().sequence, 4);
    assert_eq!(loaded.get(next).unwrap().parent, Some(three));
    assert_eq!(loaded.label(next).unwrap(), "4 (1.2.1)");
}

#[test]
fn saving_again_overwrites() {
    let (_dir, store) = temp_sessions();
    let mut tree = ContextTree::new();
    linear_turns(&mut tree, 1);
    store.save(&tree, Some("notes")).unwrap();
    linear_turns(&mut tree, 2);
    store.save(&tree, Some("notes")).unwrap();

    assert_eq!(store.load("notes").unwrap().turn_count(), 3);
    assert_eq!(store.names().unwrap(), vec!["notes"]);
}

#[test]
fn default_name_is_used_when_none_given() {
    let (_dir, store) = temp_sessions();
    let path = store.save(&ContextTree::new(), None).unwrap();
    let name = path.file_stem().unwrap().to_str().unwrap();
    assert!(name.starts_with("conversation_"), "{name}");
    assert!(store.load(name).is_ok());
}

#[test]
fn missing_session_lists_available_names() {
    let (_dir, store) = temp_sessions();
    store.save(&ContextTree::new(), Some("alpha")).unwrap();
    store.save(&ContextTree::new(), Some("beta")).unwrap();

    match store.load("gamma").unwrap_err() {
        SessionError::NotFound { name, available } => {
            assert_eq!(name, "gamma");
            assert_eq!(available, vec!["alpha", "beta"]);
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn corrupt_file_is_rejected() {
    let (_dir, store) = temp_sessions();
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.dir().join("broken.json"), "{ not json").unwrap();

    assert!(matches!(store.load("broken"), Err(SessionError::Corrupt { .. })));
}

#[test]
fn structurally_invalid_file_is_rejected() {
    let (_dir, store) = temp_sessions();
    let (tree, _) = branched_tree();
    let path = store.save(&tree, Some("trip")).unwrap();

    // Drop the last node but keep it listed as a child.
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["nodes"].as_array_mut().unwrap().pop();
    std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

    assert!(matches!(store.load("trip"), Err(SessionError::Corrupt { .. })));
}

#[test]
fn failed_load_leaves_the_live_tree_alone() {
    let (_dir, store) = temp_sessions();
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.dir().join("broken.json"), "[]").unwrap();

    let (mut live, _) = branched_tree();
    let before = live.clone();
    for name in ["broken", "absent"] {
        if let Ok(tree) = store.load(name) {
            live = tree;
        }
    }
    assert_eq!(live, before);
}

#[test]
fn invalid_names_are_refused() {
    let (_dir, store) = temp_sessions();
    let tree = ContextTree::new();
    for name in ["../escape", "a/b", "what?", "", "my plan"] {
        assert!(
            matches!(store.save(&tree, Some(name)), Err(SessionError::InvalidName(_))),
            "{name:?}"
        );
    }
}

#[test]
fn names_with_spaces_are_refused_before_writing() {
    let (_dir, store) = temp_sessions();
    let (tree, _) = branched_tree();

    assert!(matches!(
        store.save(&tree, Some("my plan")),
        Err(SessionError::InvalidName(_))
    ));
    assert!(store.names().unwrap().is_empty());

    store.save(&tree, Some("my_plan")).unwrap();
    assert_eq!(store.load("my_plan").unwrap(), tree);
}

#[test]
fn new_session_does_not_touch_saved_files() {
    let (_dir, store) = temp_sessions();
    let (mut tree, _) = branched_tree();
    let path = store.save(&tree, Some("keep")).unwrap();
    let on_disk = std::fs::read_to_string(&path).unwrap();

    linear_turns(&mut tree, 2);
    tree = session::new_session();

    assert_eq!(tree.turn_count(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
    assert_eq!(store.load("keep").unwrap().turn_count(), 3);
}

#[test]
fn listing_reports_turns_and_tags() {
    let (_dir, store) = temp_sessions();
    let (mut tree, [one, _, three]) = branched_tree();
    tree.set_tag(one, "start").unwrap();
    tree.set_tag(three, "good").unwrap();
    store.save(&tree, Some("trip")).unwrap();
    store.save(&ContextTree::new(), Some("empty")).unwrap();
    std::fs::write(store.dir().join("junk.json"), "nope").unwrap();

    let all = store.list().unwrap();
    assert_eq!(all.len(), 2);
    let trip = all.iter().find(|s| s.name == "trip").unwrap();
    assert_eq!(trip.turn_count, 3);
    assert_eq!(trip.tags, vec!["start", "good"]);

    let tagged = store.list_tagged("good").unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].name, "trip");
}

#[test]
fn listing_a_missing_directory_is_empty() {
    let (_dir, store) = temp_sessions();
    assert!(store.list().unwrap().is_empty());
    assert!(store.names().unwrap().is_empty());
}
