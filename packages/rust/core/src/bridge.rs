//! Request-level entry point: raw body in, status and text body out.

use tracing::{error, info, instrument, warn};

use crmbridge_shared::{CrmBridgeError, Result, SubmissionId};

use crate::orchestrator::{OrchestrationReport, Orchestrator};

/// HTTP-shaped result of handling one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeResponse {
    pub status: u16,
    pub body: String,
}

impl BridgeResponse {
    /// Map an orchestration outcome to the endpoint's response.
    pub fn from_outcome(outcome: &Result<OrchestrationReport>) -> Self {
        match outcome {
            Ok(report) => Self {
                status: 200,
                body: format!("Deal {} created successfully", report.deal_id()),
            },
            Err(e) => Self::from_error(e),
        }
    }

    pub fn from_error(err: &CrmBridgeError) -> Self {
        Self {
            status: err.status_code(),
            body: format!("Error: {err}"),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Validates submissions and hands them to the [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct Bridge {
    orchestrator: Orchestrator,
}

impl Bridge {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Handle one raw request body end to end.
    ///
    /// Validation runs before any CRM call, so an invalid body never causes
    /// side effects.
    pub async fn handle(&self, body: &[u8]) -> BridgeResponse {
        BridgeResponse::from_outcome(&self.process(body).await)
    }

    /// Mint a submission id, run the submission, and log the outcome.
    #[instrument(skip_all, fields(submission_id = tracing::field::Empty))]
    pub async fn process(&self, body: &[u8]) -> Result<OrchestrationReport> {
        let id = SubmissionId::new();
        tracing::Span::current().record("submission_id", tracing::field::display(id));
        info!(bytes = body.len(), "processing submission");

        let outcome = self.submit(id, body).await;

        match &outcome {
            Ok(report) => info!(deal_id = %report.deal_id(), "submission completed"),
            Err(CrmBridgeError::Validation(failure)) => {
                warn!(errors = %failure, "submission rejected");
            }
            Err(CrmBridgeError::Step(failure)) => {
                let committed: Vec<String> = failure
                    .committed
                    .iter()
                    .map(|c| format!("{}={}", c.step, c.object.id))
                    .collect();
                let upstream_body = match failure.source.as_ref() {
                    CrmBridgeError::CrmRequest { body, .. } => body.as_str(),
                    _ => "",
                };
                error!(
                    step = %failure.step,
                    upstream_status = ?failure.upstream_status(),
                    upstream_body,
                    ?committed,
                    error = %failure.source,
                    "submission failed after partial creation"
                );
            }
            Err(e) => error!(error = %e, "error processing request"),
        }

        outcome
    }

    /// Validate then orchestrate, without mapping to a response.
    pub async fn submit(&self, id: SubmissionId, body: &[u8]) -> Result<OrchestrationReport> {
        let submission = crmbridge_validation::parse_body(body)?;
        self.orchestrator.run(id, &submission).await
    }
}
