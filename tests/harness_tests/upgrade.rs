//! Stories about re-customizing a running scenario

use std::net::Ipv4Addr;
use std::sync::Arc;

use git2::Repository;
use vsphere_e2e::document::{
    CLUSTER_KIND, VSPHERE_DATACENTER_CONFIG_KIND, VSPHERE_MACHINE_CONFIG_KIND,
};
use vsphere_e2e::filler::{MachineFiller, ProviderFiller, WorkerNodeGroup};
use vsphere_e2e::provider::generate_cluster_config;
use vsphere_e2e::scenario::ClusterScenario;
use vsphere_e2e::{Error, HarnessOption, OsTemplate, VSphereHarness};

use super::helpers::*;

fn harness() -> VSphereHarness {
    VSphereHarness::with_probe(&complete_env(), Arc::new(FakeProbe::default()))
        .unwrap()
        .with_option(HarnessOption::Os(OsTemplate::Ubuntu121))
}

/// Story: a Kubernetes upgrade test moves every machine to the next template.
/// Only the upgrade fillers are applied; the rest of the file is left as the
/// running cluster has it.
#[test]
fn template_upgrade_rewrites_only_the_template() {
    init_test();
    let dir = tempfile::tempdir().unwrap();
    let harness = harness();
    let mut scenario = ClusterScenario::new("e2e", write_baseline(dir.path()));

    let upgrade = [OsTemplate::Ubuntu122.template_filler(&complete_env())];
    harness.provider_upgrade(&mut scenario, &upgrade).unwrap();

    let provider = parse(&scenario.provider_config);
    for machine in provider
        .manifests()
        .iter()
        .filter(|m| m.kind == VSPHERE_MACHINE_CONFIG_KIND)
    {
        assert_eq!(machine.spec_str(&["template"]), Some("ubuntu-1.22"));
        assert_eq!(machine.spec_str(&["osFamily"]), Some("bottlerocket"));
    }
    assert_eq!(
        provider
            .find(VSPHERE_DATACENTER_CONFIG_KIND)
            .unwrap()
            .spec_str(&["datacenter"]),
        Some("")
    );
}

/// Story: a GitOps test commits its cluster config to a repository and then
/// upgrades from the tracked copy instead of the generated file.
#[test]
fn git_upgrade_reads_the_tracked_config() {
    init_test();
    let repo_dir = tempfile::tempdir().unwrap();
    let scenario_dir = tempfile::tempdir().unwrap();
    let mut scenario = ClusterScenario::new("e2e", write_baseline(scenario_dir.path()))
        .with_git_repo(repo_dir.path());

    let relative = scenario.git_config_path();
    let tracked = BASELINE.replace("datacenter: \"\"", "datacenter: from-git");
    let full = repo_dir.path().join(&relative);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(&full, tracked).unwrap();
    let repo = Repository::init(repo_dir.path()).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(&relative).unwrap();
    index.write().unwrap();

    harness()
        .provider_upgrade_git(
            &mut scenario,
            &[ProviderFiller::for_all_machines(MachineFiller::DiskGiB(60))],
        )
        .unwrap();

    let provider = parse(&scenario.provider_config);
    assert_eq!(
        provider
            .find(VSPHERE_DATACENTER_CONFIG_KIND)
            .unwrap()
            .spec_str(&["datacenter"]),
        Some("from-git")
    );
    assert_eq!(
        provider.find(VSPHERE_MACHINE_CONFIG_KIND).unwrap().spec["diskGiB"],
        60
    );
}

#[test]
fn git_upgrade_of_an_untracked_config_fails() {
    init_test();
    let repo_dir = tempfile::tempdir().unwrap();
    Repository::init(repo_dir.path()).unwrap();
    let mut scenario = ClusterScenario::new("e2e", repo_dir.path().join("unused.yaml"))
        .with_git_repo(repo_dir.path());

    let err = harness().provider_upgrade_git(&mut scenario, &[]).unwrap_err();
    assert!(matches!(err, Error::UntrackedFile { .. }));
    assert!(scenario.provider_config.is_empty());
}

/// Story: a running cluster scales out with a new worker node group. The
/// cluster side builds on the scenario's in-memory cluster config, which
/// already holds the allocated endpoint even though it was never written to
/// disk.
#[tokio::test]
async fn new_worker_node_group_builds_on_in_memory_cluster_config() {
    init_test();
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(FakeProbe::with_live([Ipv4Addr::new(10, 0, 0, 1)]));
    let mut harness = VSphereHarness::with_probe(&complete_env(), probe).unwrap();
    let mut scenario = ClusterScenario::new("e2e", write_baseline(dir.path()));
    generate_cluster_config(&mut harness, &mut scenario).await.unwrap();

    harness
        .new_worker_node_group(
            &mut scenario,
            "worker-gpu",
            WorkerNodeGroup::new("md-gpu").with_count(1),
            vec![MachineFiller::Template("ubuntu-gpu".into())],
        )
        .unwrap();

    let provider = parse(&scenario.provider_config);
    let machine = provider
        .find_named(VSPHERE_MACHINE_CONFIG_KIND, "worker-gpu")
        .unwrap();
    assert_eq!(machine.spec_str(&["template"]), Some("ubuntu-gpu"));
    assert_eq!(machine.spec["memoryMiB"], 8192);

    let cluster = parse(&scenario.cluster_config);
    let cluster = cluster.find(CLUSTER_KIND).unwrap();
    assert_eq!(
        cluster.spec_str(&["controlPlaneConfiguration", "endpoint", "host"]),
        Some("10.0.0.2")
    );
    let groups = cluster.spec["workerNodeGroupConfigurations"].as_array().unwrap();
    assert_eq!(groups.last().unwrap()["machineGroupRef"]["name"], "worker-gpu");
}
