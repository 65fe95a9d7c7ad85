use super::broadcast::Outbox;
use super::coordinator::RoomCoordinator;
use super::events::ServerEvent;
use super::ids::{ConnectionId, RoomId};
use super::room::{Member, Role, Room};
use super::store::RoomSlot;
use crate::error::{Result, RoomError};

/// What a leave did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The mentor left; the room is gone and `ejected` members were told so.
    MentorLeft { ejected: usize },
    /// A student left; `room_closed` is set if nobody was left behind.
    StudentLeft {
        role: Role,
        remaining: usize,
        room_closed: bool,
    },
}

impl RoomCoordinator {
    /// Seat the connection behind `outbox` in `room_id`, creating the room if
    /// needed. A connection already sitting in another room leaves it first.
    pub async fn join(&self, outbox: &Outbox, room_id: &RoomId) -> Result<Role> {
        let connection = outbox.connection();

        if let Some(previous) = self.registry().room_of(connection).await {
            if &previous != room_id {
                tracing::debug!(
                    connection_id = %connection,
                    from = %previous,
                    to = %room_id,
                    "Switching rooms"
                );
                if let Err(e) = self.leave(connection, &previous).await {
                    tracing::debug!(error = %e, "Previous room already gone");
                }
            }
        }

        loop {
            let slot = self.store().get_or_create(room_id).await;
            let mut room = slot.lock().await;

            // Deleted between lookup and lock; the store no longer holds it,
            // so the next lookup creates a fresh room.
            if room.is_closed() {
                continue;
            }

            let (role, admitted) = room.admit(outbox.clone());
            self.registry()
                .assign(connection.clone(), room_id.clone())
                .await;

            outbox.send(ServerEvent::AssignRole(role.to_string()));
            outbox.send(ServerEvent::CodeUpdate(room.code().to_owned()));
            outbox.send(ServerEvent::ChatHistory(room.history()));

            let count = ServerEvent::StudentCount(room.student_count());
            if admitted {
                room.broadcast(&count, None);
                tracing::info!(
                    room_id = %room_id,
                    connection_id = %connection,
                    role = %role,
                    students = room.student_count(),
                    "Joined room"
                );
            } else {
                outbox.send(count);
                tracing::debug!(
                    room_id = %room_id,
                    connection_id = %connection,
                    role = %role,
                    "Repeated join, resent room state"
                );
            }

            return Ok(role);
        }
    }

    /// Explicit leave. Unknown rooms and non-members are reported as errors
    /// that callers are expected to ignore.
    pub async fn leave(&self, connection: &ConnectionId, room_id: &RoomId) -> Result<Departure> {
        let result = self.depart(connection, room_id).await;
        self.registry().clear_if(connection, room_id).await;
        result
    }

    /// Transport loss: forget the connection and leave whatever room it was in.
    pub async fn disconnect(&self, connection: &ConnectionId) -> Option<Departure> {
        let room_id = self.registry().unregister(connection).await;
        tracing::debug!(connection_id = %connection, "Connection closed");

        let room_id = room_id?;
        match self.depart(connection, &room_id).await {
            Ok(departure) => Some(departure),
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection,
                    room_id = %room_id,
                    error = %e,
                    "Nothing to clean up on disconnect"
                );
                None
            }
        }
    }

    async fn depart(&self, connection: &ConnectionId, room_id: &RoomId) -> Result<Departure> {
        let slot = self
            .store()
            .get(room_id)
            .await
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

        let mut room = slot.lock().await;
        if room.is_closed() {
            return Err(RoomError::RoomNotFound(room_id.to_string()));
        }

        let role = room.remove(connection).ok_or_else(|| RoomError::NotAMember {
            connection: connection.to_string(),
            room: room_id.to_string(),
        })?;

        if role.is_mentor() {
            let ejected = self.close_room(&slot, &mut room).await;
            for member in &ejected {
                member.outbox.send(ServerEvent::MentorLeft);
                self.registry().clear_if(member.connection(), room_id).await;
            }

            tracing::info!(
                room_id = %room_id,
                connection_id = %connection,
                ejected = ejected.len(),
                "Mentor left, room closed"
            );
            return Ok(Departure::MentorLeft {
                ejected: ejected.len(),
            });
        }

        let remaining = room.student_count();
        room.broadcast(&ServerEvent::StudentCount(remaining), None);
        tracing::info!(
            room_id = %room_id,
            connection_id = %connection,
            role = %role,
            students = remaining,
            "Student left room"
        );

        let room_closed = room.is_abandoned();
        if room_closed {
            self.close_room(&slot, &mut room).await;
            tracing::info!(room_id = %room_id, "Room is empty and was deleted");
        }

        Ok(Departure::StudentLeft {
            role,
            remaining,
            room_closed,
        })
    }

    /// Must be called with the room lock held.
    async fn close_room(&self, slot: &RoomSlot, room: &mut Room) -> Vec<Member> {
        let ejected = room.close();
        self.store().remove(room.id(), slot).await;
        ejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;

    fn room(id: &str) -> RoomId {
        RoomId::parse(Some(id)).unwrap()
    }

    // Drop the mentor seat without going through `leave`, leaving students
    // behind in a mentorless room.
    async fn unseat_mentor(coordinator: &RoomCoordinator, room_id: &RoomId, mentor: &ConnectionId) {
        let slot = coordinator.store().get(room_id).await.unwrap();
        let mut room = slot.lock().await;
        assert_eq!(room.remove(mentor), Some(Role::Mentor));
    }

    #[tokio::test]
    async fn test_mentorless_room_kept_while_students_remain() {
        let coordinator = RoomCoordinator::new(&RoomConfig::default());
        let r1 = room("r1");
        let (a, _ra) = Outbox::channel("a".into());
        let (b, _rb) = Outbox::channel("b".into());
        let (c, _rc) = Outbox::channel("c".into());
        for outbox in [&a, &b, &c] {
            coordinator.join(outbox, &r1).await.unwrap();
        }
        unseat_mentor(&coordinator, &r1, a.connection()).await;

        let departure = coordinator.leave(b.connection(), &r1).await.unwrap();
        assert_eq!(
            departure,
            Departure::StudentLeft {
                role: Role::Student(1),
                remaining: 1,
                room_closed: false,
            }
        );
        assert!(coordinator.room_exists(&r1).await);

        let departure = coordinator.disconnect(c.connection()).await;
        assert_eq!(
            departure,
            Some(Departure::StudentLeft {
                role: Role::Student(2),
                remaining: 0,
                room_closed: true,
            })
        );
        assert!(!coordinator.room_exists(&r1).await);
    }

    #[tokio::test]
    async fn test_join_after_close_gets_fresh_room() {
        let coordinator = RoomCoordinator::new(&RoomConfig::default());
        let r1 = room("r1");
        let (a, _ra) = Outbox::channel("a".into());
        coordinator.join(&a, &r1).await.unwrap();
        coordinator.set_code(a.connection(), &r1, "old".into()).await;

        let stale = coordinator.store().get(&r1).await.unwrap();
        coordinator.leave(a.connection(), &r1).await.unwrap();
        assert!(stale.lock().await.is_closed());

        let (b, _rb) = Outbox::channel("b".into());
        assert_eq!(coordinator.join(&b, &r1).await.unwrap(), Role::Mentor);
        assert_eq!(coordinator.snapshot(&r1).await.unwrap().code, "");
    }
}
