use std::sync::Arc;
use crate::domain::models::{
    auth::CurrentUser,
    event::Event,
    reservation::{within_deadline, Reservation, ReservationState},
};
use crate::domain::ports::{Clock, EventRepository, ProfileRepository, ReservationRepository};
use crate::error::AppError;
use tracing::{info, warn};

pub struct JoinOutcome {
    pub reservation: Reservation,
    /// Paid event inside the deadline window: the caller should go straight
    /// to payment.
    pub proceed_to_payment: bool,
}

pub struct ReservationService {
    events: Arc<dyn EventRepository>,
    reservations: Arc<dyn ReservationRepository>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl ReservationService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        reservations: Arc<dyn ReservationRepository>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { events, reservations, profiles, clock }
    }

    pub async fn join(&self, participant_id: &str, event_id: &str) -> Result<JoinOutcome, AppError> {
        self.profiles.find_by_user(participant_id).await?
            .ok_or(AppError::NotFound("Participant profile not found".into()))?;

        let event = self.load_event(event_id).await?;
        let now = self.clock.now();

        if event.start_time <= now {
            return Err(AppError::Validation("Event has already started".into()));
        }

        if self.reservations.find_by_participant_and_event(participant_id, &event.id).await?.is_some() {
            return Err(AppError::Conflict("Participant already joined this event".into()));
        }

        let draft = Reservation::admitted(&event, participant_id.to_string(), now);
        let reservation = self.reservations.create_within_capacity(&draft).await?;

        let proceed_to_payment = reservation.state == ReservationState::Joined
            && !event.is_free()
            && within_deadline(event.start_time, now);

        info!(
            reservation_id = %reservation.id,
            event_id = %event.id,
            state = %reservation.state,
            "Participant joined event"
        );

        Ok(JoinOutcome { reservation, proceed_to_payment })
    }

    pub async fn confirm_payment(&self, participant_id: &str, event_id: &str, auto_check_in: bool) -> Result<Reservation, AppError> {
        let event = self.load_event(event_id).await?;
        let reservation = self.load_reservation(participant_id, &event.id).await?;

        match reservation.state {
            ReservationState::Waitlisted => {
                return Err(AppError::Conflict("Reservation is waitlisted and cannot be paid".into()));
            }
            ReservationState::Paid | ReservationState::CheckedIn => {
                return Err(AppError::Conflict("Reservation is already paid".into()));
            }
            ReservationState::Joined => {}
        }

        let now = self.clock.now();
        let paid = reservation.transition(ReservationState::Paid, event.is_free(), now)?;
        let next = if auto_check_in || within_deadline(event.start_time, now) {
            paid.transition(ReservationState::CheckedIn, event.is_free(), now)?
        } else {
            paid
        };

        let stored = self.reservations.transition(&next, ReservationState::Joined).await?;
        info!(reservation_id = %stored.id, state = %stored.state, "Payment confirmed");
        Ok(stored)
    }

    pub async fn check_in(&self, participant_id: &str, event_id: &str) -> Result<Reservation, AppError> {
        let event = self.load_event(event_id).await?;
        let reservation = self.load_reservation(participant_id, &event.id).await?;

        match reservation.state {
            ReservationState::Waitlisted => {
                return Err(AppError::Conflict("Reservation is waitlisted".into()));
            }
            ReservationState::CheckedIn => {
                return Err(AppError::Conflict("Reservation is already checked in".into()));
            }
            ReservationState::Joined if !event.is_free() => {
                return Err(AppError::Conflict("Reservation must be paid before check-in".into()));
            }
            ReservationState::Joined | ReservationState::Paid => {}
        }

        let next = reservation.transition(ReservationState::CheckedIn, event.is_free(), self.clock.now())?;
        let stored = self.reservations.transition(&next, reservation.state).await?;
        info!(reservation_id = %stored.id, "Participant checked in");
        Ok(stored)
    }

    /// Promotes a waitlisted reservation once a slot has opened up.
    pub async fn approve(&self, actor: &CurrentUser, event_id: &str, reservation_id: &str) -> Result<Reservation, AppError> {
        let event = self.load_event(event_id).await?;
        ensure_can_manage(actor, &event)?;

        let reservation = self.reservations.find_by_id(reservation_id).await?
            .filter(|r| r.event_id == event.id)
            .ok_or(AppError::NotFound("Reservation not found".into()))?;

        let next = reservation.transition(ReservationState::Joined, event.is_free(), self.clock.now())?;
        let stored = self.reservations.admit_within_capacity(&next).await?;
        info!(reservation_id = %stored.id, approved_by = %actor.id, "Waitlisted reservation approved");
        Ok(stored)
    }

    pub async fn list_for_event(&self, actor: &CurrentUser, event_id: &str) -> Result<Vec<Reservation>, AppError> {
        let event = self.load_event(event_id).await?;
        ensure_can_manage(actor, &event)?;
        self.reservations.list_by_event(&event.id).await
    }

    pub async fn list_for_participant(&self, participant_id: &str) -> Result<Vec<Reservation>, AppError> {
        self.reservations.list_by_participant(participant_id).await
    }

    pub async fn find_for_participant(&self, participant_id: &str, event_id: &str) -> Result<Reservation, AppError> {
        self.load_reservation(participant_id, event_id).await
    }

    async fn load_event(&self, event_id: &str) -> Result<Event, AppError> {
        self.events.find_by_id(event_id).await?
            .ok_or(AppError::NotFound("Event not found".into()))
    }

    async fn load_reservation(&self, participant_id: &str, event_id: &str) -> Result<Reservation, AppError> {
        self.reservations.find_by_participant_and_event(participant_id, event_id).await?
            .ok_or(AppError::NotFound("No reservation for this event".into()))
    }
}

pub fn ensure_can_manage(actor: &CurrentUser, event: &Event) -> Result<(), AppError> {
    if actor.is_admin() || event.is_managed_by(&actor.id) {
        Ok(())
    } else {
        warn!(user_id = %actor.id, event_id = %event.id, "Rejected event management attempt");
        Err(AppError::Forbidden("Only the event's coaches can manage it".into()))
    }
}
