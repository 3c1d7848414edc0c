//! Suites composed the way generated integration suites are.

use std::sync::Arc;

use itk_prefetch::{ExecutionGuard, PrefetchConfig, Prefetcher};
use itk_suite::{Lifecycle, PrefetchStep, ScriptStep, Suite, SuiteError};
use itk_testing::{ManifestTree, RecordingRunner};
use tempfile::TempDir;

fn deployment_tree() -> ManifestTree {
    ManifestTree::new()
        .file("apps/nsc/pod.yaml", "image: ghcr.io/networkservicemesh/cmd-nsc:v1.11.0\n")
        .file(
            "examples/spire/single_cluster/server.yaml",
            "image: ghcr.io/spiffe/spire-server:1.8.0\n",
        )
}

fn spire_suite(
    tree: &ManifestTree,
    parent: &TempDir,
    runner: &Arc<RecordingRunner>,
    guard: &Arc<ExecutionGuard>,
) -> Suite {
    let config = PrefetchConfig::for_deployment_repo(tree.path())
        .with_workspace_parent(parent.path());
    let prefetcher = Prefetcher::new(config, Arc::clone(runner)).with_guard(Arc::clone(guard));

    Suite::new("spire/single_cluster")
        .with(PrefetchStep::new(prefetcher))
        .with(
            ScriptStep::new(
                "spire",
                tree.join("examples/spire/single_cluster"),
                Arc::clone(runner),
            )
            .run("kubectl apply -k .")
            .run("kubectl wait -n spire --timeout=3m --for=condition=ready pod -l app=spire-server")
            .cleanup("kubectl delete crd clusterspiffeids.spire.spiffe.io")
            .cleanup("kubectl delete ns spire"),
        )
}

#[test]
fn test_prefetch_runs_before_suite_commands() {
    let tree = deployment_tree();
    let parent = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let guard = Arc::new(ExecutionGuard::new());

    let mut suite = spire_suite(&tree, &parent, &runner, &guard);
    suite.run(|| ()).unwrap();

    let commands = runner.commands();
    assert_eq!(
        commands,
        vec![
            "kubectl apply -k .",
            "kubectl -n prefetch rollout status daemonset/prefetch --timeout=600s",
            "kubectl delete ns prefetch",
            "kubectl apply -k .",
            "kubectl wait -n spire --timeout=3m --for=condition=ready pod -l app=spire-server",
            "kubectl delete crd clusterspiffeids.spire.spiffe.io",
            "kubectl delete ns spire",
        ]
    );

    let calls = runner.calls();
    assert_eq!(calls[3].dir, tree.join("examples/spire/single_cluster"));
}

#[test]
fn test_second_suite_reuses_prefetch() {
    let tree = deployment_tree();
    let parent = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let guard = Arc::new(ExecutionGuard::new());

    spire_suite(&tree, &parent, &runner, &guard).run(|| ()).unwrap();
    spire_suite(&tree, &parent, &runner, &guard).run(|| ()).unwrap();

    assert_eq!(runner.count_matching("rollout status"), 1);
    assert_eq!(runner.count_matching("delete ns spire"), 2);
}

#[test]
fn test_prefetch_failure_stops_suite() {
    let tree = deployment_tree();
    let parent = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new().fail_on("rollout status"));
    let guard = Arc::new(ExecutionGuard::new());

    let err = spire_suite(&tree, &parent, &runner, &guard)
        .run(|| ())
        .unwrap_err();
    match err {
        SuiteError::SetUp {
            component, source, ..
        } => {
            assert_eq!(component, "prefetch");
            assert!(matches!(*source, SuiteError::Prefetch(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.count_matching("spire"), 0);

    // A later suite in the same process sees the same failure without a rerun.
    let err = spire_suite(&tree, &parent, &runner, &guard)
        .run(|| ())
        .unwrap_err();
    assert!(matches!(err, SuiteError::SetUp { .. }));
    assert_eq!(runner.count_matching("apply"), 1);
}

#[test]
fn test_script_cleanup_runs_after_failed_set_up() {
    let tree = deployment_tree();
    let runner = Arc::new(RecordingRunner::new().fail_on("kubectl wait"));
    let mut step = ScriptStep::new("spire", tree.path(), Arc::clone(&runner))
        .run("kubectl apply -k .")
        .run("kubectl wait -n spire pod -l app=spire-server")
        .run("kubectl apply -f never.yaml")
        .cleanup("kubectl delete ns spire");

    let mut suite = Suite::new("partial");
    assert!(step.set_up().is_err());
    step.tear_down().unwrap();
    assert_eq!(runner.count_matching("never.yaml"), 0);
    assert_eq!(runner.count_matching("delete ns spire"), 1);

    suite.push(step);
    assert!(suite.run(|| ()).is_err());
    assert_eq!(runner.count_matching("delete ns spire"), 2);
}

#[test]
fn test_cleanup_failure_is_reported() {
    let tree = deployment_tree();
    let runner = Arc::new(RecordingRunner::new().fail_on("delete crd"));
    let mut suite = Suite::new("leaky").with(
        ScriptStep::new("spire", tree.path(), Arc::clone(&runner))
            .cleanup("kubectl delete crd clusterspiffeids.spire.spiffe.io")
            .cleanup("kubectl delete ns spire"),
    );

    let err = suite.run(|| ()).unwrap_err();
    assert!(matches!(err, SuiteError::TearDown { .. }));
    // The cleanup script stops at its first failing line.
    assert_eq!(runner.count_matching("delete ns spire"), 0);
}
