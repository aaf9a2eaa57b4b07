//! End-to-end scenarios: reactive state driving components through the
//! renderer into the recording host.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;

use crate::host::Host;
use crate::host::props::PropTarget;
use crate::test_host::{HostOp, TestHost};
use crate::{
    AsyncComponentOptions, AsyncResolver, Callback, Children, Component, Error, HostNode,
    LifecycleHook, PatchFlags, Props, Ref, Renderer, SetupResult, Slots, Transaction, VNode, VNodeType,
    Value, comment, create_element_block, create_vnode_with_flags, define_async_component,
    flush_jobs, h, inject, inject_hook, keep_alive, on_unmounted, open_block, props, provide,
    queued_job_count, teleport, transition,
};

type Log = Rc<RefCell<Vec<String>>>;

fn mount() -> (Renderer<TestHost>, HostNode) {
    let renderer = Renderer::new(TestHost::new());
    let root = renderer.host().create_root();
    (renderer, root)
}

fn keyed_list(keys: &[&str]) -> VNode {
    let items: Vec<VNode> = keys
        .iter()
        .map(|key| h("li", props! { "key" => *key }, *key))
        .collect();
    h("ul", None, items)
}

fn count_ops(host: &TestHost, matches: impl Fn(&HostOp) -> bool) -> usize {
    host.ops().iter().filter(|op| matches(op)).count()
}

fn bump(counter: &Rc<Cell<usize>>) {
    counter.set(counter.get() + 1);
}

#[test]
fn keyed_reorder_moves_one_node() {
    cov_mark::check!(keyed_diff_general_case);
    let (renderer, root) = mount();
    renderer.render(Some(keyed_list(&["a", "b", "c", "d", "e"])), root);
    let host = renderer.host();
    let ul = host.children(root)[0];
    let before = host.children(ul);
    host.clear_ops();

    renderer.render(Some(keyed_list(&["a", "c", "b", "f", "e"])), root);

    assert_eq!(
        host.serialize(ul),
        "<ul><li>a</li><li>c</li><li>b</li><li>f</li><li>e</li></ul>"
    );
    assert_eq!(count_ops(host, |op| matches!(op, HostOp::Insert { moved: true, .. })), 1);
    assert_eq!(count_ops(host, |op| matches!(op, HostOp::CreateElement(_))), 1);
    assert_eq!(count_ops(host, |op| matches!(op, HostOp::Remove(_))), 1);
    assert!(host.ops().contains(&HostOp::Remove(before[3])));

    // Surviving items keep their host nodes.
    let after = host.children(ul);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[2]);
    assert_eq!(after[2], before[1]);
    assert_eq!(after[4], before[4]);
}

#[test]
fn appending_mounts_before_the_common_suffix() {
    let (renderer, root) = mount();
    renderer.render(Some(keyed_list(&["a", "z"])), root);
    renderer.host().clear_ops();

    renderer.render(Some(keyed_list(&["a", "b", "c", "z"])), root);

    let host = renderer.host();
    let ul = host.children(root)[0];
    assert_eq!(host.inner(ul), "<li>a</li><li>b</li><li>c</li><li>z</li>");
    assert_eq!(count_ops(host, |op| matches!(op, HostOp::CreateElement(_))), 2);
    assert_eq!(count_ops(host, |op| matches!(op, HostOp::Insert { moved: true, .. })), 0);
}

#[test]
fn prop_diff_issues_one_call_per_change() {
    let (renderer, root) = mount();
    renderer.render(Some(h("div", props! { "a" => 1, "b" => 2 }, ())), root);
    let host = renderer.host();
    let el = host.children(root)[0];
    host.clear_ops();

    renderer.render(Some(h("div", props! { "b" => 3, "c" => 4 }, ())), root);

    assert_eq!(
        host.ops(),
        vec![
            HostOp::PatchProp {
                node: el,
                key: "b".into(),
                prev: Value::Int(2),
                next: Value::Int(3),
            },
            HostOp::PatchProp {
                node: el,
                key: "c".into(),
                prev: Value::Null,
                next: Value::Int(4),
            },
            HostOp::PatchProp {
                node: el,
                key: "a".into(),
                prev: Value::Int(1),
                next: Value::Null,
            },
        ]
    );
    assert_eq!(host.serialize(el), "<div b=\"3\" c=\"4\"></div>");
}

#[test]
fn block_tree_patches_only_dynamic_nodes() {
    cov_mark::check!(block_children_patched_pairwise);
    let tree = |label: &str| {
        open_block();
        create_element_block(
            "div",
            None,
            vec![
                h("p", None, "static"),
                create_vnode_with_flags(
                    VNodeType::from("span"),
                    None,
                    Children::from(label),
                    PatchFlags::TEXT,
                    Vec::new(),
                ),
            ],
            PatchFlags::empty(),
            Vec::new(),
        )
    };
    let (renderer, root) = mount();
    renderer.render(Some(tree("1")), root);
    let host = renderer.host();
    let div = host.children(root)[0];
    let span = host.children(div)[1];
    host.clear_ops();

    renderer.render(Some(tree("2")), root);

    assert_eq!(host.ops(), vec![HostOp::SetElementText(span, "2".into())]);
    assert_eq!(host.serialize(div), "<div><p>static</p><span>2</span></div>");
}

#[test]
fn writes_between_flushes_render_once() {
    let count = Ref::new(0);
    let renders = Rc::new(Cell::new(0));
    let counter = {
        let count = count.clone();
        let renders = renders.clone();
        Component::builder("Counter")
            .render(move |_| {
                bump(&renders);
                h("span", None, count.get().to_string())
            })
            .build()
    };
    let (renderer, root) = mount();
    renderer.render(Some(h(&counter, None, ())), root);
    assert_eq!(renders.get(), 1);

    count.set(1);
    count.set(2);
    count.set(3);
    assert_eq!(renders.get(), 1);
    assert_eq!(queued_job_count(), 1);

    assert_eq!(flush_jobs(), 1);
    assert_eq!(renders.get(), 2);
    assert_eq!(renderer.host().inner(root), "<span>3</span>");

    Transaction::run(|| {
        count.set(4);
        count.set(5);
    });
    assert_eq!(renders.get(), 3);
    assert_eq!(renderer.host().inner(root), "<span>5</span>");
}

fn record_hooks(name: &'static str, log: &Log) {
    let stages = [
        (LifecycleHook::BeforeMount, "before_mount"),
        (LifecycleHook::Mounted, "mounted"),
        (LifecycleHook::BeforeUpdate, "before_update"),
        (LifecycleHook::Updated, "updated"),
        (LifecycleHook::BeforeUnmount, "before_unmount"),
        (LifecycleHook::Unmounted, "unmounted"),
    ];
    for (stage, label) in stages {
        let log = log.clone();
        inject_hook(stage, move || log.borrow_mut().push(format!("{name}:{label}")));
    }
}

#[test]
fn lifecycle_hooks_nest_parent_around_child() {
    let log: Log = Rc::default();
    let count = Ref::new(0);

    let child = {
        let log = log.clone();
        Component::builder("Child")
            .props(["n"])
            .setup(move |_, _| {
                record_hooks("child", &log);
                SetupResult::None
            })
            .render(|this| h("span", None, this.get("n").to_string()))
            .build()
    };
    let parent = {
        let log = log.clone();
        let count = count.clone();
        Component::builder("Parent")
            .setup(move |_, _| {
                record_hooks("parent", &log);
                let child = child.clone();
                let count = count.clone();
                SetupResult::render(move |_| {
                    h("div", None, vec![h(&child, props! { "n" => count.get() }, ())])
                })
            })
            .build()
    };

    let (renderer, root) = mount();
    renderer.render(Some(h(&parent, None, ())), root);
    assert_eq!(
        log.take(),
        ["parent:before_mount", "child:before_mount", "child:mounted", "parent:mounted"]
    );

    count.set(1);
    flush_jobs();
    assert_eq!(
        log.take(),
        ["parent:before_update", "child:before_update", "child:updated", "parent:updated"]
    );
    assert_eq!(renderer.host().inner(root), "<div><span>1</span></div>");

    renderer.render(None, root);
    assert_eq!(
        log.take(),
        [
            "parent:before_unmount",
            "child:before_unmount",
            "child:unmounted",
            "parent:unmounted"
        ]
    );
    assert_eq!(renderer.host().inner(root), "");
}

#[test]
fn unchanged_props_do_not_rerender_the_child() {
    let tick = Ref::new(0);
    let child_renders = Rc::new(Cell::new(0));
    let child = {
        let child_renders = child_renders.clone();
        Component::builder("Static")
            .props(["label"])
            .render(move |this| {
                bump(&child_renders);
                h("b", None, this.get("label").to_string())
            })
            .build()
    };
    let parent = {
        let tick = tick.clone();
        Component::builder("Ticker")
            .render(move |_| {
                h(
                    "div",
                    None,
                    vec![
                        text_of(&tick),
                        h(&child, props! { "label" => "fixed" }, ()),
                    ],
                )
            })
            .build()
    };

    let (renderer, root) = mount();
    renderer.render(Some(h(&parent, None, ())), root);
    tick.set(1);
    flush_jobs();

    assert_eq!(child_renders.get(), 1);
    assert_eq!(renderer.host().inner(root), "<div>1<b>fixed</b></div>");
}

fn text_of(value: &Ref) -> VNode {
    crate::text(value.get().to_string())
}

fn counted(name: &'static str, setups: &Rc<Cell<usize>>, unmounts: &Rc<Cell<usize>>) -> Component {
    let setups = setups.clone();
    let unmounts = unmounts.clone();
    Component::builder(name)
        .setup(move |_, _| {
            bump(&setups);
            let unmounts = unmounts.clone();
            on_unmounted(move || bump(&unmounts));
            SetupResult::render(move |_| h("p", None, name))
        })
        .build()
}

struct Tabs {
    which: Ref,
    setups: Vec<Rc<Cell<usize>>>,
    unmounts: Vec<Rc<Cell<usize>>>,
    tree: VNode,
}

fn cached_tabs(max: i64) -> Tabs {
    let which = Ref::new(0);
    let setups: Vec<Rc<Cell<usize>>> = (0..3).map(|_| Rc::default()).collect();
    let unmounts: Vec<Rc<Cell<usize>>> = (0..3).map(|_| Rc::default()).collect();
    let tabs: Vec<Component> = ["A", "B", "C"]
        .into_iter()
        .enumerate()
        .map(|(index, name)| counted(name, &setups[index], &unmounts[index]))
        .collect();
    let selected = which.clone();
    let tree = h(
        keep_alive(),
        props! { "max" => max },
        Slots::default_slot(move || {
            let index = selected.get().as_int().unwrap_or(0) as usize;
            h(&tabs[index], None, ())
        }),
    );
    Tabs {
        which,
        setups,
        unmounts,
        tree,
    }
}

#[test]
fn keep_alive_reactivates_without_setup() {
    cov_mark::check!(keep_alive_cache_hit);
    let tabs = cached_tabs(10);
    let (renderer, root) = mount();
    renderer.render(Some(tabs.tree.clone()), root);
    assert_eq!(renderer.host().inner(root), "<p>A</p>");

    tabs.which.set(1);
    flush_jobs();
    assert_eq!(renderer.host().inner(root), "<p>B</p>");

    tabs.which.set(0);
    flush_jobs();
    assert_eq!(renderer.host().inner(root), "<p>A</p>");
    assert_eq!(tabs.setups[0].get(), 1);
    assert_eq!(tabs.unmounts[0].get(), 0);
    assert_eq!(tabs.unmounts[1].get(), 0);
}

#[test]
fn keep_alive_evicts_least_recently_used() {
    cov_mark::check!(keep_alive_evicts_lru);
    let tabs = cached_tabs(2);
    let (renderer, root) = mount();
    renderer.render(Some(tabs.tree.clone()), root);
    for index in [1, 2] {
        tabs.which.set(index);
        flush_jobs();
    }
    assert_eq!(renderer.host().inner(root), "<p>C</p>");
    assert_eq!(tabs.unmounts[0].get(), 1);
    assert_eq!(tabs.unmounts[1].get(), 0);

    tabs.which.set(0);
    flush_jobs();
    assert_eq!(renderer.host().inner(root), "<p>A</p>");
    assert_eq!(tabs.setups[0].get(), 2);
}

#[test]
fn teleport_follows_its_target() {
    let (renderer, root) = mount();
    let host = renderer.host();
    let first = host.create_element("div");
    let second = host.create_element("div");
    host.set_attribute(first, "id", "first");
    host.set_attribute(second, "id", "second");

    let tree = |to: &str| {
        h(
            "section",
            None,
            vec![teleport(to, vec![h("span", None, "moved")])],
        )
    };

    renderer.render(Some(tree("#first")), root);
    assert_eq!(host.inner(root), "<section><!--teleport--></section>");
    assert_eq!(host.inner(first), "<span>moved</span>");

    renderer.render(Some(tree("#second")), root);
    assert_eq!(host.inner(first), "");
    assert_eq!(host.inner(second), "<span>moved</span>");

    renderer.render(None, root);
    assert_eq!(host.inner(second), "");
    assert_eq!(host.inner(root), "");
}

#[test]
fn teleport_to_missing_target_keeps_placeholder() {
    let (renderer, root) = mount();
    renderer.render(Some(teleport("#nowhere", vec![h("span", None, "lost")])), root);
    assert_eq!(renderer.host().inner(root), "<!--teleport-->");
    assert_eq!(count_ops(renderer.host(), |op| matches!(op, HostOp::CreateElement(_))), 0);
}

fn class_ops(host: &TestHost) -> Vec<String> {
    host.ops()
        .into_iter()
        .filter_map(|op| match op {
            HostOp::AddClass(_, class) => Some(format!("+{class}")),
            HostOp::RemoveClass(_, class) => Some(format!("-{class}")),
            _ => None,
        })
        .collect()
}

fn toggled_paragraph(show: &Ref, props: Props) -> VNode {
    let visible = show.clone();
    h(
        transition(),
        props,
        Slots::default_slot(move || {
            if visible.get().truthy() {
                h("p", None, "hello")
            } else {
                comment("")
            }
        }),
    )
}

#[test]
fn transition_classes_follow_frames_and_transition_end() {
    let show = Ref::new(true);
    let (renderer, root) = mount();
    let host = renderer.host();
    renderer.render(Some(toggled_paragraph(&show, props! { "name" => "fade" })), root);

    let p = host.children(root)[0];
    assert_eq!(host.class(p).as_deref(), Some("fade-enter-from fade-enter-active"));
    assert_eq!(host.run_frame(), 1);
    assert_eq!(host.class(p).as_deref(), Some("fade-enter-active fade-enter-to"));
    assert_eq!(host.end_transition(p), 1);
    assert_eq!(host.class(p), None);

    show.set(false);
    flush_jobs();
    assert_eq!(host.parent_node(p), Some(root));
    assert_eq!(host.class(p).as_deref(), Some("fade-leave-from fade-leave-active"));
    host.run_frame();
    assert_eq!(host.class(p).as_deref(), Some("fade-leave-active fade-leave-to"));
    host.end_transition(p);
    assert_eq!(host.inner(root), "<!---->");

    assert_eq!(
        class_ops(host),
        [
            "+fade-enter-from",
            "+fade-enter-active",
            "-fade-enter-from",
            "+fade-enter-to",
            "-fade-enter-to",
            "-fade-enter-active",
            "+fade-leave-from",
            "+fade-leave-active",
            "-fade-leave-from",
            "+fade-leave-to",
            "-fade-leave-active",
            "-fade-leave-to",
        ]
    );
}

#[test]
fn transition_hooks_own_done_for_enter_and_leave() {
    let show = Ref::new(true);
    let entered: Rc<RefCell<Option<Callback>>> = Rc::default();
    let left: Rc<RefCell<Option<Callback>>> = Rc::default();
    let stash = |slot: &Rc<RefCell<Option<Callback>>>| {
        let slot = slot.clone();
        Callback::new(move |args| {
            *slot.borrow_mut() = args.get(1).and_then(Value::as_func).cloned();
            Value::Null
        })
    };
    let tree = toggled_paragraph(
        &show,
        props! {
            "onEnter" => stash(&entered),
            "onLeave" => stash(&left),
            "leaveActiveClass" => "out",
        },
    );

    let (renderer, root) = mount();
    let host = renderer.host();
    renderer.render(Some(tree), root);
    let p = host.children(root)[0];
    host.run_frame();
    assert_eq!(host.end_transition(p), 0);
    assert_eq!(host.class(p).as_deref(), Some("v-enter-active v-enter-to"));

    let done = entered.borrow_mut().take().expect("enter hook received done");
    done.call(&[]);
    assert_eq!(host.class(p), None);

    show.set(false);
    flush_jobs();
    host.run_frame();
    assert_eq!(host.end_transition(p), 0);
    assert_eq!(host.inner(root), "<p class=\"out v-leave-to\">hello</p><!---->");

    let done = left.borrow_mut().take().expect("leave hook received done");
    done.call(&[]);
    assert_eq!(host.inner(root), "<!---->");
}

#[test]
fn inject_sees_the_closest_provider() {
    let seen: Log = Rc::default();
    let reader = |name: &'static str, seen: &Log| {
        let seen = seen.clone();
        Component::builder(name)
            .setup(move |_, _| {
                let theme = inject("theme", "none");
                let fallback = inject("missing", "fallback");
                seen.borrow_mut().push(format!("{name}={theme}/{fallback}"));
                SetupResult::render(|_| comment(""))
            })
            .build()
    };
    let leaf = reader("leaf", &seen);
    let sibling = reader("sibling", &seen);
    let middle = {
        let seen = seen.clone();
        Component::builder("middle")
            .setup(move |_, _| {
                provide("theme", "light");
                seen.borrow_mut()
                    .push(format!("middle={}", inject("theme", "none")));
                let leaf = leaf.clone();
                SetupResult::render(move |_| h(&leaf, None, ()))
            })
            .build()
    };
    let app = Component::builder("app")
        .setup(move |_, _| {
            provide("theme", "dark");
            let middle = middle.clone();
            let sibling = sibling.clone();
            SetupResult::render(move |_| {
                h("div", None, vec![h(&middle, None, ()), h(&sibling, None, ())])
            })
        })
        .build();

    let (renderer, root) = mount();
    renderer.render(Some(h(&app, None, ())), root);
    assert_eq!(
        seen.take(),
        ["middle=dark", "leaf=light/fallback", "sibling=dark/fallback"]
    );
}

#[test]
fn async_component_retries_then_renders() {
    let resolver: Rc<RefCell<Option<AsyncResolver>>> = Rc::default();
    let attempts_seen = Rc::new(RefCell::new(Vec::new()));

    let loading = Component::functional("Loading", |_, _| h("i", None, "loading"));
    let loaded = Component::builder("Loaded")
        .props(["label"])
        .render(|this| h("b", None, this.get("label").to_string()))
        .build();

    let options = {
        let resolver = resolver.clone();
        let attempts_seen = attempts_seen.clone();
        AsyncComponentOptions::new(move |pending| *resolver.borrow_mut() = Some(pending))
            .loading_component(loading)
            .on_error(move |_, retry, fail, attempts| {
                attempts_seen.borrow_mut().push(attempts);
                if attempts < 2 {
                    retry.retry();
                } else {
                    fail.fail();
                }
            })
    };
    let wrapper = define_async_component(options);

    let (renderer, root) = mount();
    renderer.render(Some(h(&wrapper, props! { "label" => "ready" }, ())), root);
    assert_eq!(renderer.host().inner(root), "<i>loading</i>");

    let first = resolver.borrow_mut().take().expect("loader started");
    first.reject("network down");
    assert_eq!(*attempts_seen.borrow(), [1]);

    let second = resolver.borrow_mut().take().expect("loader retried");
    second.resolve(loaded);
    // A settled resolver ignores later calls.
    second.reject("too late");
    flush_jobs();
    assert_eq!(renderer.host().inner(root), "<b>ready</b>");
    assert_eq!(*attempts_seen.borrow(), [1]);
}

#[test]
fn async_component_shows_error_component() {
    let resolver: Rc<RefCell<Option<AsyncResolver>>> = Rc::default();
    let failure = Component::builder("Failure")
        .props(["error"])
        .render(|this| h("em", None, this.get("error").to_string()))
        .build();
    let options = {
        let resolver = resolver.clone();
        AsyncComponentOptions::new(move |pending| *resolver.borrow_mut() = Some(pending))
            .error_component(failure)
    };
    let wrapper = define_async_component(options);

    let (renderer, root) = mount();
    renderer.render(Some(h(&wrapper, None, ())), root);
    assert_eq!(renderer.host().inner(root), "<div></div>");

    let pending = resolver.borrow_mut().take().expect("loader started");
    pending.reject("boom");
    flush_jobs();
    assert_eq!(
        renderer.host().inner(root),
        "<em>async component failed to load: boom</em>"
    );
}

type Timers = Rc<RefCell<Vec<(Duration, Box<dyn FnOnce()>)>>>;

fn fire_timer(timers: &Timers, after: Duration) {
    let fired = {
        let mut pending = timers.borrow_mut();
        let index = pending
            .iter()
            .position(|(duration, _)| *duration == after)
            .expect("timer armed");
        pending.remove(index).1
    };
    fired();
}

#[test]
fn async_component_delays_loading_then_times_out() {
    let resolver: Rc<RefCell<Option<AsyncResolver>>> = Rc::default();
    let timers: Timers = Rc::default();
    let loading = Component::functional("Loading", |_, _| h("i", None, "loading"));
    let failure = Component::builder("Failure")
        .props(["error"])
        .render(|this| h("em", None, this.get("error").to_string()))
        .build();
    let options = {
        let resolver = resolver.clone();
        let timers = timers.clone();
        AsyncComponentOptions::new(move |pending| *resolver.borrow_mut() = Some(pending))
            .loading_component(loading)
            .error_component(failure)
            .delay(Duration::from_millis(200))
            .timeout(Duration::from_secs(3))
            .timer(move |after, callback| timers.borrow_mut().push((after, callback)))
    };
    let wrapper = define_async_component(options);

    let (renderer, root) = mount();
    renderer.render(Some(h(&wrapper, None, ())), root);
    assert_eq!(renderer.host().inner(root), "<div></div>");
    assert_eq!(timers.borrow().len(), 2);

    fire_timer(&timers, Duration::from_millis(200));
    flush_jobs();
    assert_eq!(renderer.host().inner(root), "<i>loading</i>");

    fire_timer(&timers, Duration::from_secs(3));
    flush_jobs();
    assert_eq!(
        renderer.host().inner(root),
        "<em>async component timed out after 3s</em>"
    );

    // A late load still wins.
    let loaded = Component::functional("Loaded", |_, _| h("b", None, "late"));
    resolver.borrow_mut().take().expect("loader started").resolve(loaded);
    flush_jobs();
    assert_eq!(renderer.host().inner(root), "<b>late</b>");
}

#[test]
fn emitted_events_reach_the_parent_handler() {
    let received = Rc::new(RefCell::new(Vec::new()));
    let button = Component::builder("Button")
        .setup(|_, ctx| {
            let ctx = ctx.clone();
            SetupResult::render(move |_| {
                let ctx = ctx.clone();
                let on_click = Callback::new(move |_| {
                    ctx.emit("change", &[Value::Int(5)]);
                    Value::Null
                });
                h("button", props! { "onClick" => on_click }, "go")
            })
        })
        .build();
    let on_change = {
        let received = received.clone();
        Callback::new(move |args| {
            received.borrow_mut().extend(args.iter().cloned());
            Value::Null
        })
    };

    let (renderer, root) = mount();
    renderer.render(Some(h(&button, props! { "onChange" => on_change }, ())), root);
    let el = renderer.host().children(root)[0];
    assert!(renderer.host().dispatch(el, "click", &[]).is_some());
    assert_eq!(*received.borrow(), [Value::Int(5)]);
}

#[test]
fn template_refs_track_nodes_and_instances() {
    let el_ref = Ref::new(Value::Null);
    let card_ref = Ref::new(Value::Null);
    let card = Component::builder("Card")
        .props(["title"])
        .render(|this| h("h1", None, this.get("title").to_string()))
        .build();

    let (renderer, root) = mount();
    renderer.render(
        Some(h(
            "div",
            props! { "ref" => el_ref.clone() },
            vec![h(&card, props! { "ref" => card_ref.clone(), "title" => "x" }, ())],
        )),
        root,
    );
    let div = renderer.host().children(root)[0];
    assert_eq!(el_ref.get(), Value::Node(div));

    let Value::Instance(public) = card_ref.get() else {
        panic!("component ref should hold the public instance");
    };
    assert_eq!(public.get("title"), Value::from("x"));
    assert_eq!(
        public.try_set("title", "y"),
        Err(Error::ReadonlyProp("title".into()))
    );

    renderer.render(None, root);
    assert_eq!(el_ref.get(), Value::Null);
    assert_eq!(card_ref.get(), Value::Null);
}

fn key_orders() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::btree_set(0u8..16, 0..10)
        .prop_map(|keys| keys.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn numbered_list(keys: &[u8]) -> VNode {
    let items: Vec<VNode> = keys
        .iter()
        .map(|key| h("li", props! { "key" => i64::from(*key) }, key.to_string()))
        .collect();
    h("ul", None, items)
}

proptest! {
    #[test]
    fn keyed_diff_converges_and_reuses_nodes(old in key_orders(), new in key_orders()) {
        let (renderer, root) = mount();
        renderer.render(Some(numbered_list(&old)), root);
        let host = renderer.host();
        let ul = host.children(root)[0];
        let before: HashMap<String, HostNode> = host
            .children(ul)
            .into_iter()
            .map(|li| (host.inner(li), li))
            .collect();

        renderer.render(Some(numbered_list(&new)), root);

        let after = host.children(ul);
        let labels: Vec<String> = after.iter().map(|li| host.inner(*li)).collect();
        let expected: Vec<String> = new.iter().map(u8::to_string).collect();
        prop_assert_eq!(&labels, &expected);
        for (li, label) in after.iter().zip(&labels) {
            if let Some(previous) = before.get(label) {
                prop_assert_eq!(li, previous);
            }
        }
    }
}
