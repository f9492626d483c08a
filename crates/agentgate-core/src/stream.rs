use agentgate_transform::{StreamTransformer, StreamVariant};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::upstream_client::UpstreamBody;

const DOWNSTREAM_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamOutcome {
    Done,
    UpstreamEnded,
    ClientGone,
}

impl StreamOutcome {
    fn as_str(self) -> &'static str {
        match self {
            StreamOutcome::Done => "done",
            StreamOutcome::UpstreamEnded => "upstream_ended",
            StreamOutcome::ClientGone => "client_gone",
        }
    }
}

/// Runs the transformer over `body` on a background task and returns the
/// browser-facing stream.
///
/// The task owns the upstream body. It returns (dropping the body, which
/// stops the upstream reader) on `[DONE]`, at upstream end, or as soon as
/// the returned stream is dropped.
pub fn spawn_transform(
    body: UpstreamBody,
    variant: StreamVariant,
    enable_steps: bool,
    trace_id: String,
) -> ReceiverStream<Bytes> {
    let (tx, rx) = mpsc::channel::<Bytes>(DOWNSTREAM_BUFFER);
    tokio::spawn(async move {
        let mut transformer = StreamTransformer::new(variant, enable_steps);
        let outcome = pump(&mut transformer, body, &tx).await;
        let stats = transformer.stats();
        info!(
            event = "stream_closed",
            trace_id = %trace_id,
            outcome = outcome.as_str(),
            lines = stats.lines,
            dropped = stats.dropped,
            content_chunks = stats.content_chunks,
            steps = stats.steps,
            fallback = stats.fallback_used
        );
    });
    ReceiverStream::new(rx)
}

async fn pump(
    transformer: &mut StreamTransformer,
    body: UpstreamBody,
    tx: &mpsc::Sender<Bytes>,
) -> StreamOutcome {
    let mut upstream = match body {
        UpstreamBody::Stream(rx) => rx,
        UpstreamBody::Bytes(bytes) => {
            let pushed = transformer.push(&bytes);
            if !forward(tx, pushed.chunks).await {
                return StreamOutcome::ClientGone;
            }
            if pushed.closed {
                return StreamOutcome::Done;
            }
            return drain(transformer, tx).await;
        }
    };

    loop {
        let next = tokio::select! {
            _ = tx.closed() => return StreamOutcome::ClientGone,
            next = upstream.recv() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let pushed = transformer.push(&chunk);
        if !forward(tx, pushed.chunks).await {
            return StreamOutcome::ClientGone;
        }
        if pushed.closed {
            return StreamOutcome::Done;
        }
    }

    drain(transformer, tx).await
}

async fn drain(transformer: &mut StreamTransformer, tx: &mpsc::Sender<Bytes>) -> StreamOutcome {
    if forward(tx, transformer.finish()).await {
        StreamOutcome::UpstreamEnded
    } else {
        StreamOutcome::ClientGone
    }
}

async fn forward(tx: &mpsc::Sender<Bytes>, chunks: Vec<Bytes>) -> bool {
    for chunk in chunks {
        if tx.send(chunk).await.is_err() {
            return false;
        }
    }
    true
}
