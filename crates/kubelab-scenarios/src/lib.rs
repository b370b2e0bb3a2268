//! # kubelab-scenarios
//!
//! The workshop scenario apps. Each module is one small, standalone
//! service built to fail in one specific way once deployed to Kubernetes:
//!
//! | Module          | Failure mode                        |
//! |-----------------|-------------------------------------|
//! | [`crashloop`]   | CrashLoopBackOff from a missing env |
//! | [`webapp`]      | Service targets the wrong port      |
//! | [`blog`]        | ConfigMap not mounted               |
//! | [`pod_monitor`] | ServiceAccount lacks RBAC rights    |
//! | [`memory_hog`]  | Container exceeds its memory limit  |
//! | [`health`]      | Liveness/readiness probes misfire   |
//! | [`inventory`]   | NetworkPolicy blocks the backend    |
//! | [`orders`]      | NetworkPolicy blocks the frontend   |
//! | [`storage`]     | PersistentVolumeClaim stays Pending |
//! | [`todo`]        | Init container never completes      |
//! | [`init_wait`]   | The init container itself           |
//!
//! HTTP scenarios expose a `router(state)` constructor; [`server::serve`]
//! runs any of them.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod blog;
pub mod crashloop;
pub mod error;
pub mod health;
pub mod html;
pub mod init_wait;
pub mod inventory;
pub mod kube;
pub mod memory_hog;
pub mod orders;
pub mod pod_monitor;
pub mod server;
pub mod storage;
pub mod todo;
pub mod webapp;
