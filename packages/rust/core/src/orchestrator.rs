//! Four-step create sequence: parent company → child org → contact → deal.
//!
//! Every step after the first associates its object to the parent company id
//! returned by step 1, so the steps run strictly in order. The first failure
//! stops the sequence. Objects created by earlier steps stay in the CRM and
//! are reported back in the error.

use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crmbridge_crm::{CrmClient, Properties};
use crmbridge_shared::{
    Association, AssociationType, CommittedObject, CrmObjectRef, Result, Step, SubmissionId,
};
use crmbridge_validation::Submission;

/// Deal pipeline every new deal is filed under.
pub const DEAL_PIPELINE: &str = "28258969";

/// Initial stage of new deals within [`DEAL_PIPELINE`].
pub const DEAL_STAGE: &str = "64210478";

const SUBSCRIPTION_SERVICER: &str = "Point";
const SUBSCRIPTION_TYPE: &str = "GAP";

/// Marks the contact as the organization's point of contact.
const POC_MARKER: &str = "true";

/// Objects created by a fully successful run.
#[derive(Debug, Clone)]
pub struct OrchestrationReport {
    pub submission_id: SubmissionId,
    pub parent_company: CrmObjectRef,
    pub child_organization: CrmObjectRef,
    pub contact: CrmObjectRef,
    pub deal: CrmObjectRef,
    pub elapsed: Duration,
}

impl OrchestrationReport {
    /// Id of the deal created by the last step.
    pub fn deal_id(&self) -> &str {
        &self.deal.id
    }
}

/// Runs the create sequence against one CRM client.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    client: CrmClient,
    today: fn() -> NaiveDate,
}

impl Orchestrator {
    pub fn new(client: CrmClient) -> Self {
        Self {
            client,
            today: utc_today,
        }
    }

    /// Replace the clock used for the deal close date.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Create the four objects for a validated submission.
    ///
    /// Returns [`CrmBridgeError::Step`](crmbridge_shared::CrmBridgeError::Step)
    /// on the first failed step; nothing is retried or rolled back.
    #[instrument(skip_all, fields(submission_id = %id, company = %submission.parent_company_name()))]
    pub async fn run(&self, id: SubmissionId, submission: &Submission) -> Result<OrchestrationReport> {
        let start = Instant::now();
        let mut committed = Vec::with_capacity(Step::ALL.len());

        info!("starting CRM create sequence");

        // --- Step 1: parent company ---
        let parent = self
            .create(
                Step::ParentCompany,
                parent_company_properties(submission),
                &[],
                &mut committed,
            )
            .await?;
        let parent_id = parent.id.clone();

        // --- Step 2: child organization ---
        let child = self
            .create(
                Step::ChildOrganization,
                child_organization_properties(submission),
                &[Association::to(&parent_id, AssociationType::CompanyToCompany)],
                &mut committed,
            )
            .await?;

        // --- Step 3: contact ---
        let contact = self
            .create(
                Step::Contact,
                contact_properties(submission),
                &[Association::to(&parent_id, AssociationType::ContactToCompany)],
                &mut committed,
            )
            .await?;

        // --- Step 4: deal ---
        let close_date = (self.today)();
        let deal = self
            .create(
                Step::Deal,
                deal_properties(submission, close_date),
                &[Association::to(&parent_id, AssociationType::DealToCompany)],
                &mut committed,
            )
            .await?;

        let elapsed = start.elapsed();
        info!(
            parent_id = %parent.id,
            child_id = %child.id,
            contact_id = %contact.id,
            deal_id = %deal.id,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "CRM create sequence completed"
        );

        Ok(OrchestrationReport {
            submission_id: id,
            parent_company: parent,
            child_organization: child,
            contact,
            deal,
            elapsed,
        })
    }

    /// Run one step. On success the object is appended to `committed`; on
    /// failure the error is tagged with the step and everything committed so
    /// far, which stays in the CRM.
    async fn create(
        &self,
        step: Step,
        properties: Properties,
        associations: &[Association],
        committed: &mut Vec<CommittedObject>,
    ) -> Result<CrmObjectRef> {
        match self
            .client
            .create_object(step.object_type(), &properties, associations)
            .await
        {
            Ok(object) => {
                info!(step = %step, id = %object.id, "step completed");
                committed.push(CommittedObject {
                    step,
                    object: object.clone(),
                });
                Ok(object)
            }
            Err(e) => {
                let committed_ids: Vec<&str> =
                    committed.iter().map(|c| c.object.id.as_str()).collect();
                warn!(
                    step = %step,
                    error = %e,
                    ?committed_ids,
                    "step failed, earlier objects are left in place"
                );
                Err(e.at_step(step, std::mem::take(committed)))
            }
        }
    }
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

// ---------------------------------------------------------------------------
// Property sets
// ---------------------------------------------------------------------------

/// Step 1: the parent company, keyed by the submitted company id.
pub fn parent_company_properties(sub: &Submission) -> Properties {
    object(json!({
        "name": sub.parent_company_name(),
        "re_id": sub.company_id(),
    }))
}

/// Step 2: the child organization.
pub fn child_organization_properties(sub: &Submission) -> Properties {
    object(json!({
        "name": sub.child_company(),
    }))
}

/// Step 3: the point-of-contact person.
pub fn contact_properties(sub: &Submission) -> Properties {
    object(json!({
        "email": sub.poc_email(),
        "firstname": sub.poc_first_name(),
        "lastname": sub.poc_last_name(),
        "company": sub.parent_company_name(),
        "poc": POC_MARKER,
    }))
}

/// Step 4: the main subscription deal, closing on `close_date`.
pub fn deal_properties(sub: &Submission, close_date: NaiveDate) -> Properties {
    object(json!({
        "dealname": format!("{} Main", sub.parent_company_name()),
        "amount": sub.contract_total(),
        "closedate": close_date.format("%Y-%m-%d").to_string(),
        "pipeline": DEAL_PIPELINE,
        "dealstage": DEAL_STAGE,
        "subscription_start_date": sub.start_date(),
        "subscription_end_date": sub.end_date(),
        "subscription_servicer": SUBSCRIPTION_SERVICER,
        "subscription_type": SUBSCRIPTION_TYPE,
        "subscription_term": sub.term_years(),
    }))
}

fn object(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmbridge_shared::{ApiKey, CrmBridgeError, CrmConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn acme() -> Submission {
        crmbridge_validation::validate(&json!({
            "Parent Company Name": "Acme",
            "Company ID": 42,
            "Child Company": "Acme East",
            "Org POC Name": { "first": "Jane", "last": "Doe" },
            "Org POC Email": "jane@acme.com",
            "Contract Total": 12000,
            "Start Date": "2025-01-01",
            "End Date": "2026-01-01",
            "Term (in years)": 1
        }))
        .expect("valid submission")
    }

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn orchestrator_for(server: &MockServer) -> Orchestrator {
        let config = CrmConfig {
            base_url: url::Url::parse(&format!("{}/crm/v3/objects", server.uri())).unwrap(),
            ..CrmConfig::default()
        };
        let client = CrmClient::new(&config, ApiKey::new("test-key")).unwrap();
        Orchestrator::new(client).with_clock(fixed_day)
    }

    fn created(id: &str) -> ResponseTemplate {
        ResponseTemplate::new(201).set_body_json(json!({ "id": id }))
    }

    /// Mount companies (parent, then child), contacts and deals responders.
    async fn mount_all_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies"))
            .respond_with(created("1001"))
            .up_to_n_times(1)
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies"))
            .respond_with(created("1002"))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts"))
            .respond_with(created("2001"))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/deals"))
            .respond_with(created("9001"))
            .expect(1)
            .mount(server)
            .await;
    }

    fn body(req: &Request) -> Value {
        serde_json::from_slice(&req.body).expect("JSON request body")
    }

    #[test]
    fn deal_properties_are_complete() {
        let props = deal_properties(&acme(), fixed_day());
        assert_eq!(
            Value::Object(props),
            json!({
                "dealname": "Acme Main",
                "amount": 12000,
                "closedate": "2025-03-14",
                "pipeline": "28258969",
                "dealstage": "64210478",
                "subscription_start_date": "2025-01-01",
                "subscription_end_date": "2026-01-01",
                "subscription_servicer": "Point",
                "subscription_type": "GAP",
                "subscription_term": 1
            })
        );
    }

    #[test]
    fn contact_properties_mark_poc() {
        let props = contact_properties(&acme());
        assert_eq!(
            Value::Object(props),
            json!({
                "email": "jane@acme.com",
                "firstname": "Jane",
                "lastname": "Doe",
                "company": "Acme",
                "poc": "true"
            })
        );
    }

    #[test]
    fn parent_company_carries_external_id() {
        let props = parent_company_properties(&acme());
        assert_eq!(Value::Object(props), json!({ "name": "Acme", "re_id": 42 }));
        assert_eq!(
            Value::Object(child_organization_properties(&acme())),
            json!({ "name": "Acme East" })
        );
    }

    #[tokio::test]
    async fn four_calls_in_order_wired_to_parent() {
        let server = MockServer::start().await;
        mount_all_ok(&server).await;

        let id = SubmissionId::new();
        let report = orchestrator_for(&server)
            .run(id, &acme())
            .await
            .expect("all steps succeed");

        assert_eq!(report.submission_id, id);
        assert_eq!(report.deal_id(), "9001");
        assert_eq!(report.parent_company.id, "1001");
        assert_eq!(report.child_organization.id, "1002");
        assert_eq!(report.contact.id, "2001");

        let requests = server.received_requests().await.expect("recording enabled");
        let paths: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "/crm/v3/objects/companies",
                "/crm/v3/objects/companies",
                "/crm/v3/objects/contacts",
                "/crm/v3/objects/deals",
            ]
        );

        let first = body(&requests[0]);
        assert!(first.get("associations").is_none());

        let expected = [
            AssociationType::CompanyToCompany,
            AssociationType::ContactToCompany,
            AssociationType::DealToCompany,
        ];
        for (req, kind) in requests[1..].iter().zip(expected) {
            let associations: Vec<Association> =
                serde_json::from_value(body(req)["associations"].clone()).expect("associations");
            assert_eq!(associations.len(), 1);
            assert_eq!(associations[0].target_id(), "1001");
            assert_eq!(associations[0], Association::to("1001", kind));
        }
    }

    #[tokio::test]
    async fn parent_failure_stops_everything() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts"))
            .respond_with(created("2001"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/deals"))
            .respond_with(created("9001"))
            .expect(0)
            .mount(&server)
            .await;

        let err = orchestrator_for(&server)
            .run(SubmissionId::new(), &acme())
            .await
            .unwrap_err();

        match err {
            CrmBridgeError::Step(failure) => {
                assert_eq!(failure.step, Step::ParentCompany);
                assert!(failure.committed.is_empty());
                assert_eq!(failure.upstream_status(), Some(500));
            }
            other => panic!("expected step failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn child_org_conflict_leaves_parent_committed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies"))
            .respond_with(created("1001"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies"))
            .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
            .mount(&server)
            .await;

        let err = orchestrator_for(&server)
            .run(SubmissionId::new(), &acme())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("child organization"));
        match err {
            CrmBridgeError::Step(failure) => {
                assert_eq!(failure.step, Step::ChildOrganization);
                assert_eq!(failure.upstream_status(), Some(409));
                assert_eq!(failure.committed.len(), 1);
                assert_eq!(failure.committed[0].step, Step::ParentCompany);
                assert_eq!(failure.committed[0].object.id, "1001");
            }
            other => panic!("expected step failure, got {other:?}"),
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
    }

    #[tokio::test]
    async fn contact_failure_reports_contact_and_skips_deal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies"))
            .respond_with(created("1001"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies"))
            .respond_with(created("1002"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Property values were not valid"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/deals"))
            .respond_with(created("9001"))
            .expect(0)
            .mount(&server)
            .await;

        let err = orchestrator_for(&server)
            .run(SubmissionId::new(), &acme())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to create contact: CRM request to contacts failed with status 400"
        );
        match err {
            CrmBridgeError::Step(failure) => {
                let ids: Vec<_> = failure.committed.iter().map(|c| c.object.id.as_str()).collect();
                assert_eq!(ids, vec!["1001", "1002"]);
            }
            other => panic!("expected step failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_payload_twice_creates_two_sets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(created("1"))
            .expect(8)
            .mount(&server)
            .await;

        let orchestrator = orchestrator_for(&server);
        let sub = acme();
        orchestrator.run(SubmissionId::new(), &sub).await.unwrap();
        orchestrator.run(SubmissionId::new(), &sub).await.unwrap();
    }
}
