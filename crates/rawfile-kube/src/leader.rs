//! Lease-based leadership
//!
//! Each operator run makes a single acquire-or-renew attempt against a
//! coordination.k8s.io/v1 Lease named after the application. Updates carry
//! the lease's resourceVersion, so a concurrent writer turns our attempt
//! into a 409 and we report "not leader" for this cycle.

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::Client;
use kube::api::{Api, PostParams};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{KubeError, Result};

const LEASE_DURATION: Duration = Duration::from_secs(15);

/// Lease name used for an application
pub fn lease_name(app: &str) -> String {
    format!("{}-leader", app)
}

/// Leader elector for one application
pub struct LeaseElector {
    client: Client,
    lease_name: String,
    namespace: String,
    identity: String,
    lease_duration: Duration,
}

impl LeaseElector {
    pub fn new(client: Client, app: &str, namespace: &str, identity: &str) -> Self {
        Self {
            client,
            lease_name: lease_name(app),
            namespace: namespace.to_string(),
            identity: identity.to_string(),
            lease_duration: LEASE_DURATION,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Try to acquire or renew the lease, returning whether we lead
    ///
    /// A 404 from the lease create means the lease namespace does not exist
    /// yet and is returned as an error for the caller to classify.
    pub async fn try_acquire_or_renew(&self) -> Result<bool> {
        let api: Api<Lease> = Api::namespaced(self.client.clone(), &self.namespace);
        let now = Utc::now();

        let existing = match api.get(&self.lease_name).await {
            Ok(lease) => Some(lease),
            Err(kube::Error::Api(e)) if e.code == 404 => None,
            Err(e) => return Err(e.into()),
        };

        let Some(lease) = existing else {
            return self.create_lease(&api, now).await;
        };

        let spec = lease.spec.as_ref();
        match decide(spec, &self.identity, now) {
            LeaseDecision::Wait => {
                let holder = spec.and_then(|s| s.holder_identity.as_deref());
                debug!(identity = %self.identity, holder = ?holder, "Lease held by another");
                Ok(false)
            }
            decision => self.replace_lease(&api, &lease, now, decision).await,
        }
    }

    async fn create_lease(&self, api: &Api<Lease>, now: DateTime<Utc>) -> Result<bool> {
        let lease = Lease {
            metadata: ObjectMeta {
                name: Some(self.lease_name.clone()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            spec: Some(next_spec(
                None,
                &self.identity,
                self.lease_duration,
                now,
                LeaseDecision::TakeOver,
            )),
        };

        match api.create(&PostParams::default(), &lease).await {
            Ok(_) => {
                info!(identity = %self.identity, lease = %self.lease_name, "Created lease");
                Ok(true)
            }
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_lease(
        &self,
        api: &Api<Lease>,
        existing: &Lease,
        now: DateTime<Utc>,
        decision: LeaseDecision,
    ) -> Result<bool> {
        if existing.metadata.resource_version.is_none() {
            return Err(KubeError::api_status(
                500,
                "Invalid",
                "Lease missing resourceVersion",
            ));
        }

        let mut updated = existing.clone();
        updated.spec = Some(next_spec(
            existing.spec.as_ref(),
            &self.identity,
            self.lease_duration,
            now,
            decision,
        ));

        match api
            .replace(&self.lease_name, &PostParams::default(), &updated)
            .await
        {
            Ok(_) => {
                if decision == LeaseDecision::TakeOver {
                    info!(identity = %self.identity, lease = %self.lease_name, "Took over lease");
                }
                Ok(true)
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(identity = %self.identity, "Lease update conflict");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// What a replica should do with an existing lease
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseDecision {
    /// We hold it: refresh the renew time
    Renew,
    /// Expired or unheld: claim it and bump the transition count
    TakeOver,
    /// Someone else holds a live lease
    Wait,
}

/// Whether a lease has run out at `now`
///
/// A lease without a renew time or duration counts as expired.
pub fn is_expired(spec: Option<&LeaseSpec>, now: DateTime<Utc>) -> bool {
    let renew_time = spec.and_then(|s| s.renew_time.as_ref());
    let duration = spec.and_then(|s| s.lease_duration_seconds);
    match (renew_time, duration) {
        (Some(renewed), Some(secs)) => now > renewed.0 + chrono::Duration::seconds(secs as i64),
        _ => true,
    }
}

/// Decide how `identity` treats the current lease
pub fn decide(spec: Option<&LeaseSpec>, identity: &str, now: DateTime<Utc>) -> LeaseDecision {
    let holder = spec.and_then(|s| s.holder_identity.as_deref());
    if holder == Some(identity) {
        LeaseDecision::Renew
    } else if is_expired(spec, now) {
        LeaseDecision::TakeOver
    } else {
        LeaseDecision::Wait
    }
}

/// Lease spec written after a successful decision
///
/// Renewals keep the acquire time and transition count. Take-overs reset
/// the acquire time and count one more transition, except for a brand new
/// lease, which starts at zero.
pub fn next_spec(
    current: Option<&LeaseSpec>,
    identity: &str,
    duration: Duration,
    now: DateTime<Utc>,
    decision: LeaseDecision,
) -> LeaseSpec {
    let transitions = current.and_then(|s| s.lease_transitions).unwrap_or(0);
    let (acquire_time, transitions) = match (decision, current) {
        (LeaseDecision::Renew, Some(spec)) => (
            spec.acquire_time.clone().unwrap_or(MicroTime(now)),
            transitions,
        ),
        (_, None) => (MicroTime(now), 0),
        _ => (MicroTime(now), transitions + 1),
    };

    LeaseSpec {
        holder_identity: Some(identity.to_string()),
        lease_duration_seconds: Some(duration.as_secs() as i32),
        acquire_time: Some(acquire_time),
        renew_time: Some(MicroTime(now)),
        lease_transitions: Some(transitions),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn held_by(holder: &str, renewed: i64, transitions: i32) -> LeaseSpec {
        LeaseSpec {
            holder_identity: Some(holder.to_string()),
            lease_duration_seconds: Some(15),
            acquire_time: Some(MicroTime(at(-100))),
            renew_time: Some(MicroTime(at(renewed))),
            lease_transitions: Some(transitions),
            ..Default::default()
        }
    }

    #[test]
    fn test_lease_name() {
        assert_eq!(lease_name("rawfile"), "rawfile-leader");
    }

    #[test]
    fn test_expiry_boundary() {
        let spec = held_by("a", 0, 0);
        assert!(!is_expired(Some(&spec), at(15)));
        assert!(is_expired(Some(&spec), at(16)));
    }

    #[test]
    fn test_incomplete_lease_is_expired() {
        let spec = LeaseSpec {
            holder_identity: Some("a".to_string()),
            ..Default::default()
        };
        assert!(is_expired(Some(&spec), at(0)));
        assert!(is_expired(None, at(0)));
    }

    #[test]
    fn test_decide() {
        let spec = held_by("a", 0, 2);
        assert_eq!(decide(Some(&spec), "a", at(5)), LeaseDecision::Renew);
        assert_eq!(decide(Some(&spec), "a", at(60)), LeaseDecision::Renew);
        assert_eq!(decide(Some(&spec), "b", at(5)), LeaseDecision::Wait);
        assert_eq!(decide(Some(&spec), "b", at(60)), LeaseDecision::TakeOver);
    }

    #[test]
    fn test_renew_keeps_acquire_time_and_transitions() {
        let spec = held_by("a", 0, 2);
        let next = next_spec(Some(&spec), "a", LEASE_DURATION, at(10), LeaseDecision::Renew);

        assert_eq!(next.lease_transitions, Some(2));
        assert_eq!(next.acquire_time, Some(MicroTime(at(-100))));
        assert_eq!(next.renew_time, Some(MicroTime(at(10))));
        assert_eq!(next.lease_duration_seconds, Some(15));
    }

    #[test]
    fn test_take_over_counts_transition() {
        let spec = held_by("a", 0, 2);
        let next = next_spec(Some(&spec), "b", LEASE_DURATION, at(60), LeaseDecision::TakeOver);

        assert_eq!(next.holder_identity.as_deref(), Some("b"));
        assert_eq!(next.lease_transitions, Some(3));
        assert_eq!(next.acquire_time, Some(MicroTime(at(60))));
    }

    #[test]
    fn test_new_lease_starts_at_zero() {
        let next = next_spec(None, "a", LEASE_DURATION, at(0), LeaseDecision::TakeOver);
        assert_eq!(next.lease_transitions, Some(0));
        assert_eq!(next.holder_identity.as_deref(), Some("a"));
    }
}
