mod helpers;

use context_tree::nav::{Key, NodeSource, Picker, PickerEvent, PickerState, Rejection, TagSource};
use context_tree::tree::ContextTree;
use helpers::{branched_tree, linear_turns};

#[test]
fn typing_narrows_candidates_with_a_live_preview() {
    let mut tree = ContextTree::new();
    let ids = linear_turns(&mut tree, 12);
    let mut picker = Picker::new(NodeSource::new(&tree, 40));
    assert_eq!(picker.state(), PickerState::Idle);

    picker.handle(Key::Char('1'));
    assert_eq!(picker.state(), PickerState::Searching);
    assert_eq!(picker.candidates(), &[ids[0], ids[9], ids[10], ids[11]]);
    assert_eq!(picker.preview(), Some("Q: question 1 | A: answer 1"));

    picker.handle(Key::Char('1'));
    assert_eq!(picker.candidates(), &[ids[10]]);
    assert_eq!(picker.preview(), Some("Q: question 11 | A: answer 11"));

    picker.handle(Key::Backspace);
    assert_eq!(picker.candidates().len(), 4);
}

#[test]
fn ambiguous_enter_waits_for_more_input() {
    let mut tree = ContextTree::new();
    let ids = linear_turns(&mut tree, 12);
    let mut picker = Picker::new(NodeSource::new(&tree, 40));

    picker.type_str("1");
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Rejected(Rejection::Ambiguous(4)));
    assert_eq!(picker.buffer(), "1");

    picker.type_str("2");
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Committed(ids[11]));
    assert_eq!(picker.state(), PickerState::Idle);
}

#[test]
fn shortlist_selection_commits_the_highlight() {
    let mut tree = ContextTree::new();
    let ids = linear_turns(&mut tree, 12);
    let mut picker = Picker::new(NodeSource::new(&tree, 40));

    picker.type_str("1");
    picker.handle(Key::Down);
    picker.handle(Key::Down);
    assert_eq!(picker.highlighted(), Some(&ids[9]));
    assert_eq!(picker.preview(), Some("Q: question 10 | A: answer 10"));
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Committed(ids[9]));
}

#[test]
fn dotted_navigation_and_tab_completion() {
    let (tree, [one, two, three]) = branched_tree();
    let mut picker = Picker::new(NodeSource::new(&tree, 40));

    picker.type_str("1.");
    assert_eq!(picker.candidates(), &[one, two, three]);

    picker.handle(Key::Down);
    picker.handle(Key::Down);
    picker.handle(Key::Down);
    picker.handle(Key::Tab);
    assert_eq!(picker.buffer(), "1.2");
    assert_eq!(picker.highlighted(), Some(&three));
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Committed(three));
}

#[test]
fn tab_on_a_root_child_keeps_the_hierarchical_reading() {
    let (mut tree, [_, two, _]) = branched_tree();
    let root = tree.store().root().id;
    tree.move_to(root).unwrap();
    let second = tree.append_turn("other topic", "sure", "m").unwrap();
    assert_eq!(tree.label(second).unwrap(), "4 (2)");

    let mut picker = Picker::new(NodeSource::new(&tree, 40));
    picker.type_str("4");
    assert_eq!(picker.candidates(), &[second]);

    picker.handle(Key::Tab);
    assert_eq!(picker.buffer(), "2.");
    assert_eq!(picker.candidates(), &[second]);
    assert_eq!(picker.highlighted(), Some(&second));
    let committed = picker.handle(Key::Enter);
    assert_eq!(committed, PickerEvent::Committed(second));
    assert_ne!(committed, PickerEvent::Committed(two));
}

#[test]
fn tab_on_the_root_completes_to_zero() {
    let (tree, _) = branched_tree();
    let root = tree.store().root().id;
    let mut picker = Picker::new(NodeSource::new(&tree, 40));

    picker.type_str("0");
    assert_eq!(picker.candidates(), &[root]);
    picker.handle(Key::Tab);
    assert_eq!(picker.buffer(), "0");
    assert_eq!(picker.highlighted(), Some(&root));
    assert_eq!(picker.preview(), Some("(start of conversation)"));
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Committed(root));
}

#[test]
fn letters_are_ignored_and_no_match_is_rejected() {
    let (tree, _) = branched_tree();
    let mut picker = Picker::new(NodeSource::new(&tree, 40));

    assert_eq!(picker.handle(Key::Char('x')), PickerEvent::Ignored);
    assert_eq!(picker.buffer(), "");

    picker.type_str("9");
    assert!(picker.candidates().is_empty());
    assert_eq!(picker.preview(), None);
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Rejected(Rejection::NoMatches));
}

#[test]
fn escape_cancels_without_moving() {
    let (mut tree, [_, _, three]) = branched_tree();
    let chosen = {
        let mut picker = Picker::new(NodeSource::new(&tree, 40));
        picker.type_str("2");
        match picker.handle(Key::Escape) {
            PickerEvent::Committed(id) => Some(id),
            _ => None,
        }
    };
    if let Some(id) = chosen {
        tree.move_to(id).unwrap();
    }
    assert_eq!(tree.current_id(), three);
}

#[test]
fn tag_entry_offers_recent_tags_and_accepts_new_text() {
    let mut picker = Picker::new(TagSource::new(vec!["good".into(), "great".into(), "retry".into()]));
    assert_eq!(picker.candidates().len(), 3);

    picker.type_str("g");
    assert_eq!(picker.candidates(), &["good".to_string(), "great".to_string()]);
    assert_eq!(picker.preview(), Some("tag: good"));

    picker.handle(Key::Down);
    picker.handle(Key::Down);
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Committed("great".to_string()));

    picker.type_str("gr");
    // Typed text is taken as-is unless a shortlist row was picked.
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Committed("gr".to_string()));

    picker.type_str("brand new");
    assert_eq!(picker.handle(Key::Enter), PickerEvent::Committed("brand new".to_string()));
}
