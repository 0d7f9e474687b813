//! Two-batch submission shared by both workbenches.

use std::future::Future;

use tracing::{info, warn};

use cachenet_client::ApiResult;
use cachenet_topology::SubmitBatch;

use crate::error::{BatchFailure, SubmitError};

/// Record counts accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitOutcome {
    pub removed: usize,
    pub added: usize,
}

/// Result of each half that was sent; `None` for an empty half.
pub(crate) struct BatchResults {
    pub removals: Option<ApiResult<()>>,
    pub additions: Option<ApiResult<()>>,
}

impl BatchResults {
    /// Turn per-half results into an outcome or the list of rejections.
    pub fn finish(self, removed: usize, added: usize) -> Result<SubmitOutcome, SubmitError> {
        let mut failures = Vec::new();
        for (batch, result) in [
            (SubmitBatch::Removals, self.removals),
            (SubmitBatch::Additions, self.additions),
        ] {
            if let Some(Err(e)) = result {
                warn!(%batch, error = %e, "batch rejected");
                failures.push(BatchFailure {
                    batch,
                    reasons: e.reasons(),
                });
            }
        }
        if failures.is_empty() {
            info!(removed, added, "submission accepted");
            Ok(SubmitOutcome { removed, added })
        } else {
            Err(SubmitError::Rejected(failures))
        }
    }
}

async fn maybe<F: Future>(fut: Option<F>) -> Option<F::Output> {
    match fut {
        Some(fut) => Some(fut.await),
        None => None,
    }
}

/// Send the removal and addition batches concurrently.
pub(crate) async fn send_batches<R, A>(removals: Option<R>, additions: Option<A>) -> BatchResults
where
    R: Future<Output = ApiResult<()>>,
    A: Future<Output = ApiResult<()>>,
{
    let (removals, additions) = tokio::join!(maybe(removals), maybe(additions));
    BatchResults {
        removals,
        additions,
    }
}
