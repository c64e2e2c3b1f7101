use tracing::{error, info};
use uuid::Uuid;

use crate::models::Booking;
use crate::store::{CapacityChange, TicketStore};

/// The undo action for one completed write.
#[derive(Debug, Clone)]
pub(crate) enum Undo {
    ReleaseSlot(Uuid),
    RestoreBooking(Box<Booking>),
}

/// Undo actions of the writes a multi-step operation has completed so far.
/// Unwound in reverse order when a later step fails.
#[derive(Debug, Default)]
pub(crate) struct CompensationLog {
    steps: Vec<Undo>,
}

impl CompensationLog {
    pub(crate) fn record(&mut self, undo: Undo) {
        self.steps.push(undo);
    }

    /// The operation completed; nothing will be undone.
    pub(crate) fn commit(mut self) {
        self.steps.clear();
    }

    /// Runs every recorded undo action, newest first, and returns the ones
    /// that could not be applied. The caller surfaces the error that
    /// triggered the unwind.
    pub(crate) async fn unwind(mut self, store: &dyn TicketStore) -> Vec<Undo> {
        let mut failed = Vec::new();
        while let Some(undo) = self.steps.pop() {
            let applied = match &undo {
                Undo::ReleaseSlot(event_id) => match store.release_slot(*event_id).await {
                    Ok(CapacityChange::Applied(capacity)) => {
                        info!(
                            %event_id,
                            remaining = capacity.remaining,
                            "Compensated: released reserved capacity"
                        );
                        true
                    }
                    Ok(outcome) => {
                        error!(%event_id, ?outcome, "Compensation could not release capacity");
                        false
                    }
                    Err(e) => {
                        error!(%event_id, error = %e, "Compensation failed to release capacity");
                        false
                    }
                },
                Undo::RestoreBooking(booking) => match store.restore_booking(booking).await {
                    Ok(()) => {
                        info!(booking_id = %booking.id, "Compensated: restored deleted booking");
                        true
                    }
                    Err(e) => {
                        error!(
                            booking_id = %booking.id,
                            event_id = %booking.event_id,
                            error = %e,
                            "Compensation failed to restore booking"
                        );
                        false
                    }
                },
            };
            if !applied {
                failed.push(undo);
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::ticketing::booking::tests::fixture;

    #[tokio::test]
    async fn test_unwind_runs_newest_first_and_reports_nothing_on_success() {
        let fx = fixture(2).await;
        fx.store.reserve_slot(fx.event.id).await.unwrap();
        fx.store.reserve_slot(fx.event.id).await.unwrap();

        let mut log = CompensationLog::default();
        log.record(Undo::ReleaseSlot(fx.event.id));
        log.record(Undo::ReleaseSlot(fx.event.id));

        assert!(log.unwind(fx.store.as_ref()).await.is_empty());
        let event = fx.store.find_event(fx.event.id).await.unwrap().unwrap();
        assert_eq!(event.remaining_capacity, 2);
    }

    #[tokio::test]
    async fn test_unwind_returns_steps_it_could_not_apply() {
        let fx = fixture(2).await;
        let receipt = fx.service.book_ticket(&fx.attendee, fx.event.id).await.unwrap();
        let booking = fx.store.delete_booking(receipt.booking_id).await.unwrap().unwrap();
        fx.store.fail_restores(vec![StoreError::DuplicateBooking]);

        let mut log = CompensationLog::default();
        log.record(Undo::RestoreBooking(Box::new(booking)));
        let failed = log.unwind(fx.store.as_ref()).await;

        assert_eq!(failed.len(), 1);
        assert!(matches!(&failed[0], Undo::RestoreBooking(b) if b.id == receipt.booking_id));
    }
}
