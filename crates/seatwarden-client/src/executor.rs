//! One reservation attempt: resolve the seat, find the script that carries
//! the reservation call, run it in the sandbox, and perform the request it
//! produced.

use std::collections::HashMap;

use seatwarden_core::{ReservationOutcome, ReservationRequest, ScriptCandidate};
use seatwarden_sandbox::BridgeContext;
use tracing::{debug, info};

use crate::{
    client::LibraryClient,
    error::{ClientError, Result},
    scrape,
    session::Session,
};

/// Pick the reservation script among `candidates`.
///
/// Every candidate is inspected; when several carry both markers the last
/// one wins.
pub fn select_reservation_script(
    candidates: impl IntoIterator<Item = ScriptCandidate>,
) -> Option<ScriptCandidate> {
    candidates
        .into_iter()
        .filter(ScriptCandidate::is_reservation_script)
        .last()
}

impl<S: Session> LibraryClient<S> {
    /// Seat number to seat id for `room_id`. Empty when the room is unknown.
    pub async fn seats(&self, room_id: &str) -> Result<HashMap<String, String>> {
        let html = self.session.get(&self.endpoints.seat_layout(room_id)).await?;
        Ok(scrape::parse_seat_map(&html))
    }

    /// Fetch every script the room page references and select the
    /// reservation implementation.
    pub async fn discover_script(&self, room_id: &str) -> Result<Option<ScriptCandidate>> {
        let html = self.session.get(&self.endpoints.room_layout(room_id)).await?;
        let mut candidates = Vec::new();
        for url in scrape::script_urls(&html) {
            let content = self.session.get(&url).await?;
            candidates.push(ScriptCandidate { url, content });
        }
        debug!(room_id, scanned = candidates.len(), "room scripts fetched");
        Ok(select_reservation_script(candidates))
    }

    /// Make exactly one reservation attempt.
    ///
    /// Unknown venue, unknown seat and a missing reservation function come
    /// back as failed outcomes. HTTP failures and script timeouts are errors.
    pub async fn reserve(&self, req: &ReservationRequest) -> Result<ReservationOutcome> {
        match self.attempt(req).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => match e.as_attempt_outcome() {
                Some(outcome) => {
                    info!(room_id = %req.room_id, seat_no = %req.seat_no, code = e.code(), "reservation attempt rejected");
                    Ok(outcome)
                }
                None => Err(e),
            },
        }
    }

    async fn attempt(&self, req: &ReservationRequest) -> Result<ReservationOutcome> {
        let seats = self.seats(&req.room_id).await?;
        if seats.is_empty() {
            return Err(ClientError::VenueNotFound {
                room_id: req.room_id.clone(),
            });
        }
        let seat_id = seats
            .get(&req.seat_no)
            .cloned()
            .ok_or_else(|| ClientError::SeatNotFound {
                seat_no: req.seat_no.clone(),
            })?;

        let script = self
            .discover_script(&req.room_id)
            .await?
            .ok_or(ClientError::ReservationFunctionNotFound)?;
        debug!(url = %script.url, "reservation script selected");

        let bridge = BridgeContext::new(self.endpoints.ajax());
        let call = self
            .sandbox
            .run(script.content, bridge, req.room_id.clone(), seat_id)
            .await?;

        let body = self.session.get(&call.url).await?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ClientError::Parse(format!("reservation response: {e}")))?;
        Ok(ReservationOutcome::from_response(json))
    }
}
