use candle_core::Device;
use tracing::{debug, warn};

#[cfg(any(feature = "metal", feature = "cuda"))]
use tracing::info;

/// Picks the compute device for model inference.
///
/// GPU backends are tried in feature order (Metal, then CUDA); anything else runs on CPU,
/// so selection never fails.
/// Both encoders call this, so an embedder and a reranker loaded in the same process
/// always land on the same device.
pub fn select_device() -> Device {
    #[allow(unused_mut)]
    let mut failures: Vec<String> = Vec::new();

    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!("Using Metal GPU for inference");
            return device;
        }
        Err(e) => {
            warn!(error = %e, "Metal device unavailable");
            failures.push(format!("metal: {e}"));
        }
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            info!("Using CUDA GPU for inference");
            return device;
        }
        Err(e) => {
            warn!(error = %e, "CUDA device unavailable");
            failures.push(format!("cuda: {e}"));
        }
    }

    if failures.is_empty() {
        debug!("No GPU backend compiled in, using CPU");
    } else {
        warn!(reason = %failures.join("; "), "Falling back to CPU device");
    }

    Device::Cpu
}
