use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use tokio::time::MissedTickBehavior;

use crate::buffer::Frame;

use super::server::AppState;

const MULTIPART_MIME: &str = "multipart/x-mixed-replace; boundary=frame";

/// Build the endless multipart body for one client.
///
/// Each tick snapshots the buffer and encodes outside the lock; an empty
/// buffer or a failed encode yields nothing for that tick and the client
/// simply waits for the next part. Dropping the response on disconnect
/// unwinds the generator.
pub fn stream_response(state: &AppState) -> Response {
    let buffer = state.buffer.clone();
    let interval = state.stream_interval;

    let parts = async_stream::stream! {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(frame) = buffer.snapshot() else { continue };
            let Some(jpeg) = encode_jpeg(&frame) else { continue };
            yield Ok::<Bytes, Infallible>(Bytes::from(multipart_chunk(&jpeg)));
        }
    };

    (
        [
            (header::CONTENT_TYPE, MULTIPART_MIME),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(parts),
    )
        .into_response()
}

fn multipart_chunk(jpeg: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(jpeg.len() + 64);
    chunk.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

fn encode_jpeg(frame: &Frame) -> Option<Vec<u8>> {
    let mat = Mat::from_slice(&frame.data).ok()?;
    let mat = mat.reshape(3, frame.height).ok()?;
    let mut buf = Vector::<u8>::new();
    let params = Vector::<i32>::new();
    imgcodecs::imencode(".jpg", &mat, &mut buf, &params).ok()?;
    Some(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_chunk_framing() {
        let chunk = multipart_chunk(&[0xAA, 0xBB]);
        assert!(chunk.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(chunk.ends_with(&[0xAA, 0xBB, b'\r', b'\n']));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_bytes() {
        let frame = Frame {
            width: 8,
            height: 8,
            data: vec![200; 8 * 8 * 3],
        };

        let jpeg = encode_jpeg(&frame).unwrap();
        // JPEG start-of-image marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_jpeg_rejects_truncated_frame() {
        let frame = Frame {
            width: 8,
            height: 8,
            data: vec![200; 5],
        };
        assert!(encode_jpeg(&frame).is_none());
    }
}
