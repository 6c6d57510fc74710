//! Stream relay that moves end-of-stream metadata behind a marker frame.
//!
//! The upstream is read in a loop. Control frames (see [`is_control`]) are
//! held back; everything else is forwarded as soon as it arrives. When the
//! upstream ends, the marker goes out first and the held frames follow in
//! arrival order.
//!
//! An upstream error is forwarded and ends the relay: neither the marker nor
//! the held frames are sent after it.

use async_stream::try_stream;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tracing::{debug, trace};

use crate::frames::is_control;

pub fn relay<S, E>(upstream: S, marker: Bytes) -> BoxStream<'static, Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    Box::pin(try_stream! {
        let mut upstream = Box::pin(upstream);
        let mut held: Vec<Bytes> = Vec::new();

        while let Some(chunk) = upstream.next().await {
            let chunk = chunk?;
            if is_control(&chunk) {
                trace!(len = chunk.len(), "holding control frame");
                held.push(chunk);
            } else {
                yield chunk;
            }
        }

        debug!(held = held.len(), "upstream finished; emitting marker");
        yield marker;
        for chunk in held {
            yield chunk;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(items: &[&'static str]) -> Vec<Result<Bytes, String>> {
        items.iter().map(|s| Ok(Bytes::from_static(s.as_bytes()))).collect()
    }

    async fn collect(s: BoxStream<'static, Result<Bytes, String>>) -> Vec<Result<String, String>> {
        s.map(|r| r.map(|b| String::from_utf8_lossy(&b).into_owned()))
            .collect()
            .await
    }

    const MARKER: &str = "0:\"-- marker --\"\n";

    #[tokio::test]
    async fn control_frames_follow_marker() {
        let upstream = stream::iter(chunks(&[
            "0:\"normal1\"\n",
            "e:{\"finishReason\":\"stop\"}\n",
            "0:\"normal2\"\n",
            "d:{\"finishReason\":\"stop\"}\n",
        ]));
        let out = collect(relay(upstream, Bytes::from_static(MARKER.as_bytes()))).await;
        let out: Vec<String> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            out,
            [
                "0:\"normal1\"\n",
                "0:\"normal2\"\n",
                MARKER,
                "e:{\"finishReason\":\"stop\"}\n",
                "d:{\"finishReason\":\"stop\"}\n",
            ]
        );
    }

    #[tokio::test]
    async fn empty_upstream_still_gets_marker() {
        let upstream = stream::iter(chunks(&[]));
        let out = collect(relay(upstream, Bytes::from_static(MARKER.as_bytes()))).await;
        assert_eq!(out, [Ok(MARKER.to_string())]);
    }

    #[tokio::test]
    async fn error_stops_relay_without_marker() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from_static(b"0:\"a\"\n")),
            Ok(Bytes::from_static(b"e:{}\n")),
            Err("upstream reset".to_string()),
            Ok(Bytes::from_static(b"0:\"never\"\n")),
        ]);
        let out = collect(relay(upstream, Bytes::from_static(MARKER.as_bytes()))).await;
        assert_eq!(
            out,
            [Ok("0:\"a\"\n".to_string()), Err("upstream reset".to_string())]
        );
    }
}
