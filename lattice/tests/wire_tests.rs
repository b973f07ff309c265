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

use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use lattice::prelude::*;

use crate::setup::initialize_tracing;
use crate::setup::doubles::{CountingRecipient, DeadEndSender};

mod setup;

fn launch() -> BusRuntime {
    Bus::launch_with(BusConfig::default()).expect("runtime should launch")
}

/// Stream that fails mid-read, standing in for a broken connection.
struct BrokenStream;

impl AsyncRead for BrokenStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "carrier lost",
        )))
    }
}

#[tokio::test]
async fn request_round_trips_between_runtimes() -> anyhow::Result<()> {
    initialize_tracing();
    let origin_runtime = launch();
    let target_runtime = launch();

    // Origin side: an urgent in-flight request.
    let sender: SenderRef = DeadEndSender::arc();
    let request = Request::pending(origin_runtime.queue(), sender.clone());
    request.set_urgent(true);
    request.process();

    let codec = origin_runtime.protocols().handler_for("lattice")?;
    let bytes = codec.serialize(1, &WireInfo::of_request(&request), "/root/printer")?;

    // Target side: both addresses are known to the resolver.
    let recipient = CountingRecipient::arc();
    let resolvers = target_runtime.resolvers();
    resolvers.register_origin(sender.id().to_string(), sender.clone());
    resolvers.register_recipient("/root/printer", recipient);

    let inbound = target_runtime.protocols().handler_for("lattice")?;
    let mut stream = Cursor::new(bytes);
    let frame = inbound
        .read(&mut stream)
        .await?
        .expect("stream carries one frame");
    assert_eq!(frame.id, 1);

    let rebuilt = resolvers.rebuild_request(&frame, &target_runtime.queue())?;
    assert_eq!(rebuilt.state(), RequestState::Submitted);
    assert!(rebuilt.urgent());
    assert_eq!(rebuilt.sender().id(), sender.id());
    assert_eq!(rebuilt.recipients().len(), 1);

    origin_runtime.shutdown_all().await;
    target_runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn unknown_addresses_cannot_be_rebuilt() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let frame = WireFrame {
        id: 9,
        recipient: "/root/nowhere".to_string(),
        info: WireInfo {
            sender: "stranger".to_string(),
            state: "new".to_string(),
            urgent: false,
        },
    };

    let err = runtime
        .resolvers()
        .rebuild_request(&frame, &runtime.queue())
        .unwrap_err();
    assert!(err.to_string().contains("stranger"));

    // Registering only the origin still leaves the recipient unresolved.
    let sender: SenderRef = DeadEndSender::arc();
    runtime.resolvers().register_origin("stranger", sender);
    let err = runtime
        .resolvers()
        .rebuild_request(&frame, &runtime.queue())
        .unwrap_err();
    assert!(err.to_string().contains("/root/nowhere"));

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn remote_failure_becomes_a_generic_problem() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let sender: SenderRef = DeadEndSender::arc();
    let recipient = CountingRecipient::arc();
    let resolvers = runtime.resolvers();
    resolvers.register_origin("peer", sender);
    resolvers.register_recipient("/root/sink", recipient);

    let frame = WireFrame {
        id: 2,
        recipient: "/root/sink".to_string(),
        info: WireInfo {
            sender: "peer".to_string(),
            state: "failed".to_string(),
            urgent: false,
        },
    };
    let rebuilt = resolvers.rebuild_request(&frame, &runtime.queue())?;
    let state = rebuilt.state();
    assert!(state.is_failed());
    // The original cause stayed on the remote side.
    assert!(state
        .problem()
        .expect("failed state carries a placeholder cause")
        .to_string()
        .contains("remotely"));

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn broken_channel_surfaces_as_an_io_error() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let codec = runtime.protocols().handler_for("lattice")?;

    let mut stream = BrokenStream;
    let err = codec.read(&mut stream).await.unwrap_err();
    assert!(matches!(err, WireError::Io(_)));

    runtime.shutdown_all().await;
    Ok(())
}

#[tokio::test]
async fn unknown_scheme_is_a_typed_miss() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = launch();
    let err = runtime.protocols().handler_for("telegraph").unwrap_err();
    assert!(matches!(err, WireError::HandlerUnavailable(_)));
    assert_eq!(runtime.protocols().schemes(), vec!["lattice"]);

    runtime.shutdown_all().await;
    Ok(())
}
