use absensi_core::{EncodeError, FaceEncoder, FaceSignature};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending requests before callers start waiting on `send`.
const ENGINE_QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("engine thread exited")]
    ChannelClosed,
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Messages sent from async tasks to the engine thread.
struct EncodeRequest {
    image_bytes: Vec<u8>,
    reply: oneshot::Sender<Result<Vec<FaceSignature>, EncodeError>>,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EncodeRequest>,
}

impl EngineHandle {
    /// Decode a photo and compute one signature per face, off the async runtime.
    pub async fn encode(&self, image_bytes: Vec<u8>) -> Result<Vec<FaceSignature>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EncodeRequest {
                image_bytes,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }
}

/// Spawn the encoder on a dedicated OS thread.
///
/// Requests are served one at a time in arrival order; the thread exits once
/// every handle has been dropped.
pub fn spawn_engine<E>(mut encoder: E) -> Result<EngineHandle, EngineError>
where
    E: FaceEncoder + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EncodeRequest>(ENGINE_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("absensi-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                let started = std::time::Instant::now();
                let result = encoder.encode(&req.image_bytes);
                match &result {
                    Ok(sigs) => tracing::debug!(
                        faces = sigs.len(),
                        bytes = req.image_bytes.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "encoded image"
                    ),
                    Err(e) => tracing::debug!(error = %e, "encode failed"),
                }
                let _ = req.reply.send(result);
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}


#[cfg(test)]
mod tests {
    use super::testing::fake_engine;
    use super::*;

    #[tokio::test]
    async fn test_encode_roundtrips_through_thread() {
        let engine = fake_engine();
        let sigs = engine.encode(b"0.1,0.2\n0.3,0.4".to_vec()).await.unwrap();
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[1].values, vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_encode_no_faces() {
        let engine = fake_engine();
        assert!(engine.encode(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_encode_error_is_propagated() {
        let engine = fake_engine();
        let err = engine.encode(b"corrupt".to_vec()).await.unwrap_err();
        assert!(matches!(err, EngineError::Encode(EncodeError::Decode(_))));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_engine() {
        let engine = fake_engine();
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.encode(format!("{i}.0").into_bytes()).await })
            })
            .collect();
        for (i, task) in tasks.into_iter().enumerate() {
            let sigs = task.await.unwrap().unwrap();
            assert_eq!(sigs[0].values, vec![i as f32]);
        }
    }
}
