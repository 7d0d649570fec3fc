//! Reservation lifecycle.
//!
//! A reservation moves through `WAITLISTED -> JOINED -> PAID -> CHECKED_IN`.
//! Transitions only go forward; there is no un-pay and no un-check-in. The
//! legacy boolean flags seen by API clients are derived from the state so an
//! illegal combination (checked in but unpaid, paid while waitlisted) cannot
//! be stored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use crate::domain::models::event::Event;
use crate::error::AppError;

/// Window before an event's start during which pay and check-in collapse.
pub fn deadline_window() -> Duration {
    Duration::days(2)
}

/// `0 < start - now < 2 days`.
pub fn within_deadline(event_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let remaining = event_start - now;
    remaining > Duration::zero() && remaining < deadline_window()
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    Waitlisted,
    Joined,
    Paid,
    CheckedIn,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Waitlisted => "WAITLISTED",
            ReservationState::Joined => "JOINED",
            ReservationState::Paid => "PAID",
            ReservationState::CheckedIn => "CHECKED_IN",
        }
    }

    /// Counts against event capacity.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, ReservationState::Waitlisted)
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, ReservationState::Paid | ReservationState::CheckedIn)
    }

    /// Transition table. `free_event` allows JOINED -> CHECKED_IN since
    /// payment is implicit for free events.
    pub fn can_transition(&self, to: ReservationState, free_event: bool) -> bool {
        use ReservationState::*;
        matches!(
            (self, to, free_event),
            (Waitlisted, Joined, _) | (Joined, Paid, _) | (Paid, CheckedIn, _) | (Joined, CheckedIn, true)
        )
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITLISTED" => Ok(ReservationState::Waitlisted),
            "JOINED" => Ok(ReservationState::Joined),
            "PAID" => Ok(ReservationState::Paid),
            "CHECKED_IN" => Ok(ReservationState::CheckedIn),
            other => Err(AppError::InternalWithMsg(format!("Unknown reservation state '{}'", other))),
        }
    }
}

impl TryFrom<String> for ReservationState {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Reservation {
    pub id: String,
    pub event_id: String,
    pub participant_id: String,
    #[sqlx(try_from = "String")]
    pub state: ReservationState,
    pub paid_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Builds the reservation a participant gets when a slot is free. Free
    /// events inside the deadline window go straight to CHECKED_IN. The
    /// repository demotes it to WAITLISTED if the event turns out to be full.
    pub fn admitted(event: &Event, participant_id: String, now: DateTime<Utc>) -> Self {
        let auto_check_in = event.is_free() && within_deadline(event.start_time, now);
        let (state, paid_at, checked_in_at) = if auto_check_in {
            (ReservationState::CheckedIn, Some(now), Some(now))
        } else {
            (ReservationState::Joined, None, None)
        };

        Self {
            id: Uuid::new_v4().to_string(),
            event_id: event.id.clone(),
            participant_id,
            state,
            paid_at,
            checked_in_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn waitlisted(&self) -> Self {
        Self {
            state: ReservationState::Waitlisted,
            paid_at: None,
            checked_in_at: None,
            ..self.clone()
        }
    }

    /// Applies a single transition, stamping the relevant timestamps.
    pub fn transition(&self, to: ReservationState, free_event: bool, now: DateTime<Utc>) -> Result<Self, AppError> {
        if !self.state.can_transition(to, free_event) {
            return Err(AppError::Conflict(format!(
                "Reservation cannot move from {} to {}",
                self.state, to
            )));
        }

        let mut next = self.clone();
        next.state = to;
        next.updated_at = now;
        if to.is_paid() && next.paid_at.is_none() {
            next.paid_at = Some(now);
        }
        if to == ReservationState::CheckedIn {
            next.checked_in_at = Some(now);
        }
        Ok(next)
    }
}
