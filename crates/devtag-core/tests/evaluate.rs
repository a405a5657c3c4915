mod support;

use devtag_core::config::{ConfigFile, EvalMethod, EvaluateCfg};
use devtag_core::notify::UeventAction;
use devtag_core::resolve::LinkLayout;
use devtag_core::SpecEvaluator;
use std::fs;
use std::path::PathBuf;
use support::{DeviceTree, FileNodes, MockCache, RecordingNotifier, TextProbe};

type TestEvaluator<S> = SpecEvaluator<S, TextProbe, MockCache, RecordingNotifier, FileNodes>;

fn evaluator<S>(tree: &DeviceTree, config: S, cache: MockCache) -> TestEvaluator<S>
where
    S: devtag_core::ConfigSource,
{
    SpecEvaluator::new(config, TextProbe::default(), cache)
        .with_notifier(RecordingNotifier::default())
        .with_nodes(FileNodes::default())
        .with_layout(LinkLayout::under(tree.link_root()))
}

fn link_then_scan() -> EvaluateCfg {
    EvaluateCfg::new(vec![EvalMethod::Udev, EvalMethod::Scan], true)
}

#[test]
fn plain_paths_pass_through_without_config() {
    let tree = DeviceTree::new();
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("devtag.toml");
    fs::write(&broken, "not toml [").unwrap();
    let cache = MockCache::default();
    let eval = evaluator(&tree, ConfigFile::new(&broken), cache.clone());

    for input in ["/dev/sda1", "sdb", "/dev/disk/by-id/usb-Some_Thing"] {
        assert_eq!(eval.evaluate(input, None, None), Some(PathBuf::from(input)));
    }
    assert_eq!(cache.opens(), 0);
}

#[test]
fn combined_spec_resolves_through_verified_link() {
    let tree = DeviceTree::new();
    let device = tree.device("sdx", &[("UUID", "aaaa-bbbb")]);
    tree.link("uuid", "aaaa-bbbb", "sdx");
    let cache = MockCache::default();
    let eval = evaluator(&tree, link_then_scan(), cache.clone());

    assert_eq!(eval.evaluate("UUID=aaaa-bbbb", None, None), Some(device.clone()));
    assert_eq!(eval.evaluate("UUID", Some("aaaa-bbbb"), None), Some(device));
    assert_eq!(cache.opens(), 0);
}

#[test]
fn quoted_values_are_unquoted() {
    let tree = DeviceTree::new();
    let device = tree.device("sdc1", &[("LABEL", "my disk")]);
    tree.link("label", "my\\x20disk", "sdc1");
    let eval = evaluator(&tree, link_then_scan(), MockCache::default());

    assert_eq!(eval.evaluate("LABEL=\"my disk\"", None, None), Some(device));
}

#[test]
fn malformed_specs_are_not_resolved() {
    let tree = DeviceTree::new();
    let cache = MockCache::with_entry("", "x", "/dev/sda");
    let eval = evaluator(&tree, link_then_scan(), cache.clone());

    assert_eq!(eval.evaluate("=x", None, None), None);
    assert_eq!(eval.evaluate("LABEL=", None, None), None);
    assert_eq!(eval.evaluate("LABEL='x", None, None), None);
    assert_eq!(cache.opens(), 0);
}

#[test]
fn empty_token_passes_through_or_reaches_cache() {
    let tree = DeviceTree::new();
    let cache = MockCache::with_entry("", "v", "/dev/x");
    let eval = evaluator(&tree, link_then_scan(), cache.clone());

    assert_eq!(eval.evaluate("", None, None), Some(PathBuf::new()));
    assert_eq!(cache.opens(), 0);

    assert_eq!(
        eval.evaluate("", Some("v"), None),
        Some(PathBuf::from("/dev/x"))
    );
    assert_eq!(cache.opens(), 1);
    assert!(eval.notifier().events().is_empty());
}

#[test]
fn stale_link_falls_through_to_cache() {
    let tree = DeviceTree::new();
    let stale = tree.device("sdx", &[("UUID", "cccc-dddd")]);
    tree.link("uuid", "aaaa-bbbb", "sdx");
    let cache = MockCache::with_entry("UUID", "aaaa-bbbb", "/dev/sdq");
    let eval = evaluator(&tree, link_then_scan(), cache.clone());

    assert_eq!(
        eval.evaluate("UUID=aaaa-bbbb", None, None),
        Some(PathBuf::from("/dev/sdq"))
    );
    assert_eq!(eval.notifier().events(), vec![(stale, UeventAction::Change)]);
}

#[test]
fn unsupported_token_falls_through_without_touching_links() {
    let tree = DeviceTree::new();
    let cache = MockCache::with_entry("FOO", "bar", "/dev/sdf");
    let nodes = FileNodes::default();
    let probe = TextProbe::default();
    let eval = SpecEvaluator::new(link_then_scan(), probe.clone(), cache.clone())
        .with_notifier(RecordingNotifier::default())
        .with_nodes(nodes.clone())
        .with_layout(LinkLayout::under(tree.link_root()));

    assert_eq!(eval.evaluate("FOO=bar", None, None), Some(PathBuf::from("/dev/sdf")));
    assert!(nodes.lookups.lock().unwrap().is_empty());
    assert!(probe.calls.lock().unwrap().is_empty());
}

#[test]
fn configured_order_is_respected() {
    let tree = DeviceTree::new();
    let device = tree.device("sdx", &[("LABEL", "boot")]);
    tree.link("label", "boot", "sdx");
    let cache = MockCache::with_entry("LABEL", "boot", "/dev/cached");

    let scan_first = EvaluateCfg::new(vec![EvalMethod::Scan, EvalMethod::Udev], true);
    let eval = evaluator(&tree, scan_first, cache.clone());
    assert_eq!(
        eval.evaluate("LABEL=boot", None, None),
        Some(PathBuf::from("/dev/cached"))
    );

    let link_only = EvaluateCfg::new(vec![EvalMethod::Udev], true);
    let eval = evaluator(&tree, link_only, cache);
    assert_eq!(eval.evaluate("LABEL=boot", None, None), Some(device));
}

#[test]
fn empty_order_resolves_nothing() {
    let tree = DeviceTree::new();
    tree.device("sdx", &[("LABEL", "boot")]);
    tree.link("label", "boot", "sdx");
    let cache = MockCache::with_entry("LABEL", "boot", "/dev/cached");
    let eval = evaluator(&tree, EvaluateCfg::new(Vec::new(), true), cache.clone());

    assert_eq!(eval.evaluate("LABEL=boot", None, None), None);
    assert_eq!(cache.opens(), 0);
}

#[test]
fn config_load_failure_is_unresolved() {
    let tree = DeviceTree::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devtag.toml");
    fs::write(&path, "[evaluate]\norder = 7\n").unwrap();
    let cache = MockCache::with_entry("LABEL", "boot", "/dev/cached");
    let eval = evaluator(&tree, ConfigFile::new(&path), cache.clone());

    assert_eq!(eval.evaluate("LABEL=boot", None, None), None);
    assert_eq!(cache.opens(), 0);
}

#[test]
fn config_file_is_reloaded_per_evaluation() {
    let tree = DeviceTree::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devtag.toml");
    fs::write(&path, "[evaluate]\norder = []\n").unwrap();
    let cache = MockCache::with_entry("LABEL", "boot", "/dev/cached");
    let eval = evaluator(&tree, ConfigFile::new(&path), cache);

    assert_eq!(eval.evaluate("LABEL=boot", None, None), None);
    fs::write(&path, "[evaluate]\norder = [\"scan\"]\n").unwrap();
    assert_eq!(
        eval.evaluate("LABEL=boot", None, None),
        Some(PathBuf::from("/dev/cached"))
    );
}

#[test]
fn caller_cache_slot_is_reused_across_evaluations() {
    let tree = DeviceTree::new();
    let cache = MockCache::with_entry("LABEL", "home", "/dev/sdh1");
    let eval = evaluator(&tree, link_then_scan(), cache.clone());
    let mut slot = None;

    assert_eq!(
        eval.evaluate("LABEL=home", None, Some(&mut slot)),
        Some(PathBuf::from("/dev/sdh1"))
    );
    let first = slot.as_ref().map(|handle| handle.id);
    assert_eq!(eval.evaluate("LABEL=missing", None, Some(&mut slot)), None);
    assert_eq!(
        eval.evaluate("LABEL", Some("home"), Some(&mut slot)),
        Some(PathBuf::from("/dev/sdh1"))
    );

    assert_eq!(cache.opens(), 1);
    assert_eq!(cache.closes(), 0);
    assert_eq!(slot.as_ref().map(|handle| handle.id), first);
    assert_eq!(slot.as_ref().map(|handle| handle.lookups), Some(3));
}

#[test]
fn transient_cache_handles_are_closed() {
    let tree = DeviceTree::new();
    let cache = MockCache::with_entry("LABEL", "home", "/dev/sdh1");
    let eval = evaluator(&tree, link_then_scan(), cache.clone());

    eval.evaluate("LABEL=home", None, None);
    eval.evaluate("LABEL=other", None, None);
    assert_eq!(cache.opens(), 2);
    assert_eq!(cache.closes(), 2);
}

#[test]
fn all_strategies_failing_is_unresolved() {
    let tree = DeviceTree::new();
    let eval = evaluator(&tree, link_then_scan(), MockCache::unavailable());

    assert_eq!(eval.evaluate("UUID=aaaa-bbbb", None, None), None);
}
