//! Registry of in-flight mutations, keyed by the ids they touch.
//!
//! A target id belongs to at most one in-flight mutation. A call identical to
//! a running one joins it and shares its outcome; a call that merely overlaps
//! waits for the running one to finish and then asks again.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use jd_core::{JobId, MutationId, MutationOp, MutationOutcome, QueryKey};

/// What the caller of [`SingleFlight::admit`] should do next.
pub(crate) enum Admission {
    /// No conflict; the caller now owns the targets and must call `finish`.
    Lead,
    /// An identical mutation is running; its outcome arrives here.
    Join(oneshot::Receiver<MutationOutcome>),
    /// Overlapping targets are busy; retry admission once this fires.
    Wait(oneshot::Receiver<()>),
}

struct Flight {
    id: MutationId,
    key: QueryKey,
    op: MutationOp,
    targets: BTreeSet<JobId>,
    joiners: Vec<oneshot::Sender<MutationOutcome>>,
    waiters: Vec<oneshot::Sender<()>>,
}

#[derive(Default)]
pub(crate) struct SingleFlight {
    flights: Mutex<Vec<Flight>>,
}

impl SingleFlight {
    pub(crate) fn admit(
        &self,
        id: MutationId,
        key: &QueryKey,
        op: &MutationOp,
        targets: &[JobId],
    ) -> Admission {
        let wanted: BTreeSet<JobId> = targets.iter().cloned().collect();
        let mut flights = self.flights.lock();

        if let Some(flight) = flights
            .iter_mut()
            .find(|f| f.key == *key && f.op == *op && f.targets == wanted)
        {
            debug!(mutation_id = %flight.id, key = %key, "joining identical in-flight mutation");
            let (tx, rx) = oneshot::channel();
            flight.joiners.push(tx);
            return Admission::Join(rx);
        }

        if let Some(flight) = flights
            .iter_mut()
            .find(|f| !f.targets.is_disjoint(&wanted))
        {
            debug!(
                mutation_id = %flight.id,
                key = %key,
                "targets overlap an in-flight mutation, queueing"
            );
            let (tx, rx) = oneshot::channel();
            flight.waiters.push(tx);
            return Admission::Wait(rx);
        }

        flights.push(Flight {
            id,
            key: key.clone(),
            op: op.clone(),
            targets: wanted,
            joiners: Vec::new(),
            waiters: Vec::new(),
        });
        Admission::Lead
    }

    /// Release the targets of `id` and wake everyone parked on it.
    ///
    /// Calling this for an id that is not registered is a no-op.
    pub(crate) fn finish(&self, id: MutationId, outcome: &MutationOutcome) {
        let flight = {
            let mut flights = self.flights.lock();
            let Some(pos) = flights.iter().position(|f| f.id == id) else {
                return;
            };
            flights.swap_remove(pos)
        };

        debug!(
            mutation_id = %id,
            joiners = flight.joiners.len(),
            waiters = flight.waiters.len(),
            "in-flight mutation released"
        );
        for joiner in flight.joiners {
            let _ = joiner.send(outcome.clone());
        }
        for waiter in flight.waiters {
            let _ = waiter.send(());
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }
}
