//! Integration tests for the scenario harness
//!
//! # Test Organization
//!
//! Tests are organized by the story they tell:
//!
//! - `customization`: Stories about turning a baseline config into a
//!   scenario-specific one for a fresh cluster
//!
//! - `upgrade`: Stories about re-customizing a running scenario, from disk or
//!   from a git working tree, and adding worker node groups
//!
//! - `allocation`: Stories about handing out control plane endpoints from a
//!   shared pool or by probing a CIDR block
//!
//! - `management`: Stories about pointing a workload test at an existing
//!   management cluster

mod allocation;
mod helpers;
mod management;
mod upgrade;
