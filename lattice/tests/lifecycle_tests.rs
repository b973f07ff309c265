/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::sync::Arc;

use lattice::prelude::*;

use crate::setup::initialize_tracing;

mod setup;

fn launch() -> BusRuntime {
    Bus::launch_with(BusConfig::default()).expect("runtime should launch")
}

#[tokio::test]
async fn attachment_walks_the_node_to_initialized() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let hub = runtime.root();
    hub.declare_mount("worker");

    let node = runtime.new_node("worker")?;
    assert_eq!(node.state(), NodeState::UNATTACHED);
    assert_eq!(node.meta_state(), MetaState::Fresh);

    let attached = hub.add("worker", &node)?;
    assert!(attached.outcome().await.is_successful());

    assert_eq!(node.state(), NodeState::INITIALIZED);
    assert_eq!(node.meta_state(), MetaState::Operative);
    assert_eq!(node.path(), "/root/worker");
    assert!(hub.context().contains(&node));
    let member = node.membership().expect("attached node has a membership");
    assert_eq!(member.name(), "worker");

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn undeclared_mount_is_refused_before_any_state_change() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let hub = runtime.root();

    let node = runtime.new_node("stray")?;
    let err = hub.add("stray", &node).unwrap_err();
    assert!(matches!(err, AttachError::MountPointUndefined { .. }));
    // Refusal happened before the ladder started.
    assert_eq!(node.state(), NodeState::UNATTACHED);

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn already_attached_node_cannot_attach_again() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let hub = runtime.root();
    hub.declare_mount("primary");
    hub.declare_mount("secondary");

    let node = runtime.new_node("greedy")?;
    assert!(hub.add("primary", &node)?.outcome().await.is_successful());

    let err = hub.add("secondary", &node).unwrap_err();
    assert!(matches!(err, AttachError::InvalidMember { .. }));

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn contended_name_fails_the_second_attachment() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let hub = runtime.root();
    hub.declare_mount("slot");

    let first = runtime.new_node("first")?;
    assert!(hub.add("slot", &first)?.outcome().await.is_successful());

    let second = runtime.new_node("second")?;
    let contested = hub.add("slot", &second)?;
    let outcome = contested.outcome().await;
    assert!(outcome.is_failed());
    assert!(outcome
        .problem()
        .expect("refusal carries a cause")
        .to_string()
        .contains("slot"));
    // The loser parks mid-ladder and never becomes a member.
    assert!(!hub.context().contains(&second));
    assert!(second.membership().is_none());

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn dismissal_releases_the_name_for_reuse() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let hub = runtime.root();
    hub.declare_mount("revolving");

    let tenant = runtime.new_node("tenant")?;
    assert!(hub.add("revolving", &tenant)?.outcome().await.is_successful());

    let member = hub.member("revolving").expect("member is on the roster");
    assert!(member.dismiss().outcome().await.is_successful());

    assert_eq!(tenant.state(), NodeState::DETACHED);
    assert_eq!(tenant.meta_state(), MetaState::Defunct);
    assert!(tenant.membership().is_none());
    assert!(!hub.context().contains(&tenant));

    // The vacated name is immediately claimable.
    let successor = runtime.new_node("successor")?;
    assert!(hub
        .add("revolving", &successor)?
        .outcome()
        .await
        .is_successful());

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn never_initialized_member_detaches_cleanly() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let hub = runtime.new_hub("annex")?;
    hub.declare_mount("bench");

    let node = runtime.new_node("bench_node")?;
    assert!(hub.add("bench", &node)?.outcome().await.is_successful());

    // Wind the node back to ATTACHED, as if initialization never happened,
    // then dismiss it; the detach ladder must cope from there too.
    node.set_state(NodeState::ATTACHED);
    let member = node.membership().expect("still a member");
    assert!(member.dismiss().outcome().await.is_successful());
    assert_eq!(node.state(), NodeState::DETACHED);

    runtime.shutdown_all().await;
    Ok(())
}

#[derive(Debug)]
struct ClockService {
    ticks: u64,
}

#[tokio::test]
async fn services_resolve_locally_and_through_the_chain() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();

    // Runtime-wide capability, visible to nodes created afterwards as well
    // as before.
    runtime.provides("clock", Arc::new(ClockService { ticks: 42 }));

    let node = runtime.new_node("consumer")?;
    let inherited = node.service::<ClockService>("clock")?;
    assert_eq!(inherited.ticks, 42);

    // A local offer shadows the inherited one under the same key.
    node.provides("clock", Arc::new(ClockService { ticks: 7 }));
    assert_eq!(node.service::<ClockService>("clock")?.ticks, 7);
    // The runtime's own view is unchanged.
    assert_eq!(runtime.service::<ClockService>("clock")?.ticks, 42);

    // Unknown keys and unknown types are typed misses, not panics.
    let miss = node.service::<ClockService>("sundial").unwrap_err();
    assert_eq!(miss.key, "sundial");
    assert!(node.service::<String>("clock").is_err());

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn hubs_nest_under_hubs() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let root = runtime.root();
    root.declare_mount("district");

    let district = runtime.new_hub("district")?;
    assert!(root
        .add("district", &district)?
        .outcome()
        .await
        .is_successful());
    assert_eq!(district.path(), "/root/district");

    district.declare_mount("office");
    let office = runtime.new_node("office")?;
    assert!(district
        .add("office", &office)?
        .outcome()
        .await
        .is_successful());
    assert_eq!(office.path(), "/root/district/office");

    runtime.shutdown_all().await;
    Ok(())
}
