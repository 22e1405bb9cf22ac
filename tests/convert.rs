use conv3d::convert::{
    ConversionOutcome, ConvertError, ConvertOpts, Converter, RootPolicy, convert_sync,
    convert_tree,
};
use conv3d::native::{NativeNode, NativeScene};
use conv3d::object::SourceObject;
use conv3d::traversal::Traversal;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Converter with scriptable failures and liveness, recording its batch
/// lifecycle so tests can watch it from outside the iterator borrow.
#[derive(Default)]
struct ScriptedConverter {
    /// Ids whose conversion errors.
    fail: HashSet<String>,
    /// Ids whose conversion comes back empty-handed.
    null: HashSet<String>,
    /// Liveness flips off after this many conversions.
    die_after: Option<usize>,
    converted: usize,
    events: Rc<RefCell<Vec<&'static str>>>,
    queries: Rc<Cell<usize>>,
}

impl Converter for ScriptedConverter {
    fn can_convert(&self, obj: &SourceObject) -> bool {
        self.queries.set(self.queries.get() + 1);
        obj.speckle_type != "skip"
    }

    fn convert_single(
        &mut self,
        obj: &SourceObject,
        scene: &mut NativeScene,
    ) -> Result<Option<usize>, ConvertError> {
        self.converted += 1;
        if self.fail.contains(&obj.id) {
            return Err(ConvertError::Geometry(format!("{} scripted to fail", obj.id)));
        }
        if self.null.contains(&obj.id) {
            return Ok(None);
        }
        let node = NativeNode {
            name: obj.name.clone().unwrap_or_default(),
            ..Default::default()
        };
        Ok(Some(scene.add_node(node)))
    }

    fn begin_batch(&mut self) {
        self.events.borrow_mut().push("begin");
    }

    fn finish_batch(&mut self) {
        self.events.borrow_mut().push("finish");
    }

    fn is_active(&self) -> bool {
        self.die_after.is_none_or(|n| self.converted < n)
    }
}

fn node(id: &str, children: Vec<SourceObject>) -> SourceObject {
    SourceObject {
        children,
        ..SourceObject::new("Element", id)
    }
}

fn skip(id: &str, children: Vec<SourceObject>) -> SourceObject {
    SourceObject {
        children,
        ..SourceObject::new("skip", id)
    }
}

fn handles<'a>(outcomes: &[ConversionOutcome<'a>]) -> HashMap<&'a str, usize> {
    outcomes
        .iter()
        .filter_map(|o| o.converted().map(|h| (o.context().current.id.as_str(), h)))
        .collect()
}

#[test]
fn test_hierarchy_preserved() {
    let root = node(
        "r",
        vec![
            node("a", vec![node("b", vec![]), node("c", vec![])]),
            node("d", vec![]),
        ],
    );
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter::default();
    let outcomes = convert_sync(&root, &mut scene, &mut conv, ConvertOpts::default()).unwrap();

    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(ConversionOutcome::is_success));
    let h = handles(&outcomes);

    assert_eq!(scene.nodes[h["r"]].parent, None);
    assert_eq!(scene.nodes[h["a"]].parent, Some(h["r"]));
    assert_eq!(scene.nodes[h["b"]].parent, Some(h["a"]));
    assert_eq!(scene.nodes[h["c"]].parent, Some(h["a"]));
    assert_eq!(scene.nodes[h["d"]].parent, Some(h["r"]));
    assert_eq!(scene.root_nodes, [h["r"]]);
}

#[test]
fn test_skip_and_reattach() {
    // non-convertible interior object: its children attach to the grandparent
    let root = node("r", vec![skip("m", vec![node("c", vec![])])]);
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter::default();
    let outcomes = convert_sync(&root, &mut scene, &mut conv, ConvertOpts::default()).unwrap();

    let ids = outcomes
        .iter()
        .map(|o| o.context().current.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["r", "c"]);
    let h = handles(&outcomes);
    assert_eq!(scene.nodes[h["c"]].parent, Some(h["r"]));
}

#[test]
fn test_failure_isolation() {
    let root = node(
        "r",
        vec![node("a", vec![node("g", vec![])]), node("s", vec![])],
    );
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter {
        fail: HashSet::from(["a".to_string()]),
        ..Default::default()
    };
    let outcomes = convert_sync(&root, &mut scene, &mut conv, ConvertOpts::default()).unwrap();

    let ids = outcomes
        .iter()
        .map(|o| o.context().current.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["r", "a", "g", "s"], "failure must not stop traversal");
    assert!(matches!(
        outcomes[1].error(),
        Some(ConvertError::Geometry(_))
    ));

    // the failed object's child lands on the nearest converted ancestor
    let h = handles(&outcomes);
    assert!(!h.contains_key("a"));
    assert_eq!(scene.nodes[h["g"]].parent, Some(h["r"]));
    assert_eq!(scene.nodes[h["s"]].parent, Some(h["r"]));
}

#[test]
fn test_failed_root_falls_back_to_external_parent() {
    let root = node("r", vec![node("c", vec![])]);
    let mut scene = NativeScene::new();
    let ext = scene.add_node(NativeNode {
        name: "host".to_string(),
        ..Default::default()
    });
    let mut conv = ScriptedConverter {
        null: HashSet::from(["r".to_string()]),
        ..Default::default()
    };
    let outcomes = convert_sync(
        &root,
        &mut scene,
        &mut conv,
        ConvertOpts {
            external_parent: Some(ext),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(matches!(
        outcomes[0].error(),
        Some(ConvertError::NullConversion)
    ));
    let h = handles(&outcomes);
    assert_eq!(scene.nodes[h["c"]].parent, Some(ext));
}

#[test]
fn test_no_success_without_object() {
    let root = node("r", vec![node("f", vec![]), node("n", vec![])]);
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter {
        fail: HashSet::from(["f".to_string()]),
        null: HashSet::from(["n".to_string()]),
        ..Default::default()
    };
    let outcomes = convert_sync(&root, &mut scene, &mut conv, ConvertOpts::default()).unwrap();

    assert_eq!(outcomes.len(), 3);
    for o in &outcomes {
        assert_eq!(o.is_success(), o.converted().is_some());
        assert_eq!(o.is_success(), o.error().is_none());
    }
}

#[test]
fn test_lazy_batch_bracket() {
    let root = node("r", vec![node("a", vec![])]);
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter::default();
    let events = conv.events.clone();
    let queries = conv.queries.clone();

    let mut iter = convert_tree(&root, &mut scene, &mut conv, ConvertOpts::default());
    assert_eq!(queries.get(), 0, "nothing may run before the first pull");
    assert!(events.borrow().is_empty());

    let first = iter.next().unwrap().unwrap();
    assert!(first.is_success());
    assert_eq!(events.borrow().as_slice(), ["begin"]);
    assert!(!iter.is_exhausted());

    while iter.next().is_some() {}
    assert!(iter.is_exhausted());
    assert_eq!(events.borrow().as_slice(), ["begin", "finish"]);

    // pulling past the end stays fused and does not reopen the batch
    assert!(iter.next().is_none());
    assert_eq!(events.borrow().as_slice(), ["begin", "finish"]);
}

#[test]
fn test_naming_fallback_is_deterministic() {
    let mut named = node("beam0001", vec![]);
    named.name = Some("Beam-7".to_string());
    let root = node("abcdef1234", vec![named]);

    for _ in 0..2 {
        let mut scene = NativeScene::new();
        let mut conv = ScriptedConverter::default();
        let outcomes = convert_sync(&root, &mut scene, &mut conv, ConvertOpts::default()).unwrap();
        let h = handles(&outcomes);
        assert_eq!(scene.nodes[h["abcdef1234"]].name, "Element_abcdef12");
        assert_eq!(scene.nodes[h["beam0001"]].name, "Beam-7");
    }
}

#[test]
fn test_end_to_end_scenario() {
    // Root(nonconv) -> A(conv) -> B(nonconv) -> C(conv)
    let root = skip(
        "root",
        vec![node("a", vec![skip("b", vec![node("c", vec![])])])],
    );
    let mut scene = NativeScene::new();
    let ext = scene.add_node(NativeNode {
        name: "host".to_string(),
        ..Default::default()
    });
    let mut conv = ScriptedConverter::default();
    let outcomes = convert_sync(
        &root,
        &mut scene,
        &mut conv,
        ConvertOpts {
            external_parent: Some(ext),
            ..Default::default()
        },
    )
    .unwrap();

    let ids = outcomes
        .iter()
        .map(|o| o.context().current.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["a", "c"], "filtered objects yield no outcome");

    let h = handles(&outcomes);
    assert_eq!(scene.nodes[h["a"]].parent, Some(ext));
    assert_eq!(scene.nodes[h["c"]].parent, Some(h["a"]));
}

#[test]
fn test_root_policy_under() {
    let root = node("r", vec![]);
    let mut scene = NativeScene::new();
    let anchor = scene.add_node(NativeNode::default());
    let mut conv = ScriptedConverter::default();
    let outcomes = convert_sync(
        &root,
        &mut scene,
        &mut conv,
        ConvertOpts {
            root_policy: RootPolicy::Under(anchor),
            ..Default::default()
        },
    )
    .unwrap();

    let h = handles(&outcomes);
    assert_eq!(scene.nodes[h["r"]].parent, Some(anchor));
}

#[test]
fn test_filter_sees_unfiltered_ancestors() {
    // exclude everything under the (non-convertible) quarantine object
    let root = node(
        "r",
        vec![
            skip("quarantine", vec![node("x", vec![])]),
            node("y", vec![]),
        ],
    );
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter::default();
    let outcomes = convert_sync(
        &root,
        &mut scene,
        &mut conv,
        ConvertOpts {
            filter: Some(&|t: &Traversal, ix| {
                !t.ancestors(ix)
                    .any(|a| t.contexts()[a].current.id == "quarantine")
            }),
            ..Default::default()
        },
    )
    .unwrap();

    let ids = outcomes
        .iter()
        .map(|o| o.context().current.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["r", "y"]);
}

#[test]
fn test_mid_traversal_invalidation() {
    let root = node("r", vec![node("a", vec![]), node("b", vec![])]);
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter {
        die_after: Some(1),
        ..Default::default()
    };
    let events = conv.events.clone();

    let mut iter = convert_tree(&root, &mut scene, &mut conv, ConvertOpts::default());
    assert!(iter.next().unwrap().unwrap().is_success());
    assert!(matches!(
        iter.next(),
        Some(Err(ConvertError::ExecutionInvalid))
    ));
    assert!(iter.next().is_none(), "no further outcomes after the raise");
    assert!(iter.is_exhausted());
    // aborted runs never reach the closing hook
    assert_eq!(events.borrow().as_slice(), ["begin"]);
}

#[test]
fn test_convert_sync_propagates_invalidation() {
    let root = node("r", vec![node("a", vec![])]);
    let mut scene = NativeScene::new();
    let mut conv = ScriptedConverter {
        die_after: Some(1),
        ..Default::default()
    };
    assert!(matches!(
        convert_sync(&root, &mut scene, &mut conv, ConvertOpts::default()),
        Err(ConvertError::ExecutionInvalid)
    ));
}
