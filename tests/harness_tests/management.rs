//! Stories about running workload tests against an existing management cluster

use vsphere_e2e::cluster::{load_management, ManagementCluster};
use vsphere_e2e::Error;

use super::helpers::init_test;

const MANAGEMENT_KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: mgmt-admin@mgmt
clusters:
  - name: mgmt
    cluster:
      server: https://10.0.0.6:6443
      insecure-skip-tls-verify: true
contexts:
  - name: mgmt-admin@mgmt
    context:
      cluster: mgmt
      user: mgmt-admin
users:
  - name: mgmt-admin
    user:
      token: not-a-real-token
"#;

/// Story: the workload suite is pointed at the management cluster created by
/// an earlier job. The descriptor is named after that cluster and flagged as
/// an existing management cluster.
#[test]
fn kubeconfig_describes_the_management_cluster() {
    init_test();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mgmt.kubeconfig");
    std::fs::write(&path, MANAGEMENT_KUBECONFIG).unwrap();

    let mgmt = load_management(&path).unwrap();
    assert_eq!(
        mgmt,
        Some(ManagementCluster {
            name: "mgmt".into(),
            kubeconfig: path,
            existing_management: true,
        })
    );
}

#[test]
fn no_kubeconfig_means_a_self_managed_test() {
    init_test();
    assert_eq!(load_management("").unwrap(), None);
}

#[test]
fn kubeconfig_without_clusters_is_rejected() {
    init_test();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.kubeconfig");
    std::fs::write(&path, "apiVersion: v1\nkind: Config\nclusters: []\n").unwrap();

    assert!(matches!(
        load_management(&path).unwrap_err(),
        Error::NoClusters { .. }
    ));
}
