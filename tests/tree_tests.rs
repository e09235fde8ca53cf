use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use vexline::editor::{KeyCode, KeyEvent};
use vexline::input::InputEvent;
use vexline::select_option;
use vexline::terminal::BufferWriter;
use vexline::tree::{
    AnimationControl, AnimationManager, Component, ComponentTree, Empty, Footer, Header, Position,
    Prompt, Text, TextStyle, View,
};

type Callback = Box<dyn FnMut() -> AnimationControl + Send>;

fn compact(content: &str) -> Component {
    Component::Text(Text::new(content, TextStyle::Default).compact())
}

fn framed_view() -> View<Vec<u8>> {
    let mut view = View::new(BufferWriter::buffer(40, 20), Duration::from_millis(150));
    view.initialize(Header::new("vexline"), "> ", Footer::new(""))
        .expect("initialize");
    view
}

fn options() -> Vec<String> {
    ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect()
}

fn set_text(tree: &mut ComponentTree<Vec<u8>>, id: vexline::tree::NodeId, content: &str) {
    if let Some(Component::Text(text)) = tree.component_mut(id) {
        text.set_content(content);
    }
}

#[test]
fn test_update_component_is_idempotent() {
    let mut tree = ComponentTree::new(BufferWriter::buffer(40, 20));
    tree.append_child(None, Component::Header(Header::new("vexline")));
    let body = tree.append_child(None, compact("first\nsecond"));
    let prompt = tree.append_child(None, Component::Prompt(Prompt::new("> ")));
    tree.render_full().expect("render");
    tree.writer_mut().take_contents();

    tree.update_component(body).expect("first update");
    let first_table = tree.positions().clone();
    let first_output = tree.writer_mut().take_contents();

    tree.update_component(body).expect("second update");
    let second_output = tree.writer_mut().take_contents();

    for id in tree.children(None) {
        assert_eq!(tree.position(*id), first_table.get(*id));
    }
    assert_eq!(first_output, second_output);
    assert_eq!(tree.position(prompt).map(|p| p.start_row), Some(5));
}

#[test]
fn test_text_growth_and_shrink_shift_followers_by_the_difference() {
    let mut tree = ComponentTree::new(BufferWriter::buffer(40, 20));
    let text = tree.append_child(None, compact("one line"));
    let middle = tree.append_child(None, Component::Empty(Empty::new(2)));
    let last = tree.append_child(None, compact("tail"));
    tree.render_full().expect("render");

    assert_eq!(tree.position(text), Some(Position { start_row: 1, height: 1 }));
    assert_eq!(tree.position(middle).map(|p| p.start_row), Some(2));
    assert_eq!(tree.position(last).map(|p| p.start_row), Some(4));

    set_text(&mut tree, text, "one\ntwo\nthree");
    tree.update_component(text).expect("grow");
    assert_eq!(tree.position(text), Some(Position { start_row: 1, height: 3 }));
    assert_eq!(tree.position(middle).map(|p| p.start_row), Some(4));
    assert_eq!(tree.position(last).map(|p| p.start_row), Some(6));
    assert!(tree.positions().is_contiguous(tree.children(None)));

    set_text(&mut tree, text, "one line");
    tree.update_component(text).expect("shrink");
    assert_eq!(tree.position(middle).map(|p| p.start_row), Some(2));
    assert_eq!(tree.position(last).map(|p| p.start_row), Some(4));
    assert!(tree.positions().is_contiguous(tree.children(None)));
}

#[test]
fn test_removed_node_leaves_no_gap() {
    let mut tree = ComponentTree::new(BufferWriter::buffer(40, 20));
    let first = tree.append_child(None, compact("first"));
    let doomed = tree.append_child(None, Component::Empty(Empty::new(3)));
    let last = tree.append_child(None, compact("last"));
    tree.render_full().expect("render");

    tree.remove_rendered(doomed).expect("remove");
    assert!(!tree.contains(doomed));
    assert_eq!(tree.position(doomed), None);
    assert_eq!(tree.position(last).map(|p| p.start_row), Some(2));
    assert_eq!(tree.children(None), &[first, last]);
    assert!(tree.positions().is_contiguous(tree.children(None)));
}

#[tokio::test(start_paused = true)]
async fn test_animation_stopped_before_first_tick_never_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut animations: AnimationManager<Callback> = AnimationManager::new();
    animations.start_animation(
        "spinner",
        Duration::from_millis(100),
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            AnimationControl::Continue
        }),
    );
    assert!(animations.stop_animation("spinner"));

    tokio::time::sleep(Duration::from_millis(500)).await;

    while let Some(tick) = animations.try_next_tick() {
        if let Some(callback) = animations.callback_for(&tick) {
            callback();
        }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!animations.has_animation("spinner"));
}

#[tokio::test(start_paused = true)]
async fn test_select_option_moves_and_picks() {
    let mut view = framed_view();
    let prompt = view.prompt_id().expect("prompt");
    let prompt_row = view.tree().position(prompt).map(|p| p.start_row);
    let (tx, mut rx) = mpsc::unbounded_channel();
    for code in [KeyCode::Down, KeyCode::Down, KeyCode::Down, KeyCode::Up, KeyCode::Enter] {
        tx.send(InputEvent::Key(KeyEvent::plain(code))).expect("send");
    }

    let picked = select_option(&mut view, &mut rx, "Model", options(), 5)
        .await
        .expect("menu");

    assert_eq!(picked.as_deref(), Some("beta"));
    assert!(view.writer_mut().contents().contains("› gamma"));
    // The menu band is closed again.
    assert_eq!(view.tree().children(None).len(), 4);
    assert_eq!(view.tree().position(prompt).map(|p| p.start_row), prompt_row);
    assert!(view.tree().positions().is_contiguous(view.tree().children(None)));
}

#[tokio::test(start_paused = true)]
async fn test_select_option_escape_cancels() {
    let mut view = framed_view();
    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(InputEvent::Key(KeyEvent::plain(KeyCode::Down))).expect("send");
    tx.send(InputEvent::Key(KeyEvent::plain(KeyCode::Escape))).expect("send");

    let picked = select_option(&mut view, &mut rx, "Model", options(), 5)
        .await
        .expect("menu");
    assert_eq!(picked, None);
    assert_eq!(view.tree().children(None).len(), 4);

    drop(tx);
    let picked = select_option(&mut view, &mut rx, "Model", options(), 5)
        .await
        .expect("menu");
    assert_eq!(picked, None);
    assert_eq!(
        select_option(&mut view, &mut rx, "Empty", Vec::new(), 5)
            .await
            .expect("menu"),
        None
    );
}
