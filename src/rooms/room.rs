use std::collections::VecDeque;
use std::fmt;

use serde::{Serialize, Serializer};

use super::broadcast::{fan_out, Outbox};
use super::events::{ChatMessage, ServerEvent};
use super::ids::{ConnectionId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Mentor,
    /// 1-based join sequence number within the room.
    Student(u32),
}

impl Role {
    pub fn is_mentor(&self) -> bool {
        matches!(self, Role::Mentor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Mentor => f.write_str("mentor"),
            Role::Student(n) => write!(f, "Student {}", n),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub role: Role,
    pub outbox: Outbox,
}

impl Member {
    pub fn connection(&self) -> &ConnectionId {
        self.outbox.connection()
    }
}

/// Point-in-time copy of a room, for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub mentor: Option<ConnectionId>,
    pub students: Vec<(ConnectionId, Role)>,
    pub code: String,
    pub messages: Vec<ChatMessage>,
}

/// Authoritative state of one room. Always accessed under its room lock.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    mentor: Option<Member>,
    // Join order; labels come from `next_student`, not the roster length.
    students: Vec<Member>,
    next_student: u32,
    code: String,
    messages: VecDeque<ChatMessage>,
    history_limit: usize,
    closed: bool,
}

impl Room {
    pub fn new(id: RoomId, history_limit: usize) -> Self {
        Self {
            id,
            mentor: None,
            students: Vec::new(),
            next_student: 1,
            code: String::new(),
            messages: VecDeque::new(),
            history_limit: history_limit.max(1),
            closed: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn role_of(&self, connection: &ConnectionId) -> Option<Role> {
        self.members()
            .find(|m| m.connection() == connection)
            .map(|m| m.role.clone())
    }

    /// Seat a connection. The first seat goes to the mentor, every later one
    /// to the next numbered student. Returns the role and whether the
    /// connection was newly added (false if it was already seated).
    pub fn admit(&mut self, outbox: Outbox) -> (Role, bool) {
        if let Some(role) = self.role_of(outbox.connection()) {
            return (role, false);
        }

        let role = if self.mentor.is_none() {
            self.mentor = Some(Member {
                role: Role::Mentor,
                outbox,
            });
            Role::Mentor
        } else {
            let role = Role::Student(self.next_student);
            self.next_student += 1;
            self.students.push(Member {
                role: role.clone(),
                outbox,
            });
            role
        };
        (role, true)
    }

    /// Unseat a connection, returning the role it held.
    pub fn remove(&mut self, connection: &ConnectionId) -> Option<Role> {
        if self
            .mentor
            .as_ref()
            .is_some_and(|m| m.connection() == connection)
        {
            return self.mentor.take().map(|m| m.role);
        }

        let index = self
            .students
            .iter()
            .position(|m| m.connection() == connection)?;
        Some(self.students.remove(index).role)
    }

    pub fn has_mentor(&self) -> bool {
        self.mentor.is_some()
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    /// No mentor and no students left.
    pub fn is_abandoned(&self) -> bool {
        self.mentor.is_none() && self.students.is_empty()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn set_code(&mut self, code: String) {
        self.code = code;
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        if self.messages.len() >= self.history_limit {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.mentor.iter().chain(self.students.iter())
    }

    pub fn broadcast(&self, event: &ServerEvent, except: Option<&ConnectionId>) -> usize {
        fan_out(self.members().map(|m| &m.outbox), event, except)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the room deleted and hand back whoever was still seated.
    pub fn close(&mut self) -> Vec<Member> {
        self.closed = true;
        let mut ejected: Vec<Member> = self.mentor.take().into_iter().collect();
        ejected.append(&mut self.students);
        ejected
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            mentor: self.mentor.as_ref().map(|m| m.connection().clone()),
            students: self
                .students
                .iter()
                .map(|m| (m.connection().clone(), m.role.clone()))
                .collect(),
            code: self.code.clone(),
            messages: self.history(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn room() -> Room {
        Room::new(RoomId::parse(Some("r1")).unwrap(), 3)
    }

    fn outbox(id: &str) -> (Outbox, Receiver<ServerEvent>) {
        Outbox::channel(id.into())
    }

    #[test]
    fn test_first_seat_is_mentor_then_numbered_students() {
        let mut room = room();
        let (a, _ra) = outbox("a");
        let (b, _rb) = outbox("b");
        let (c, _rc) = outbox("c");

        assert_eq!(room.admit(a), (Role::Mentor, true));
        assert_eq!(room.admit(b), (Role::Student(1), true));
        assert_eq!(room.admit(c), (Role::Student(2), true));
        assert_eq!(room.student_count(), 2);
        assert!(room.has_mentor());
    }

    #[test]
    fn test_student_numbers_are_not_reused() {
        let mut room = room();
        let (a, _ra) = outbox("a");
        let (b, _rb) = outbox("b");
        let (c, _rc) = outbox("c");
        room.admit(a);
        room.admit(b);

        assert_eq!(room.remove(&"b".into()), Some(Role::Student(1)));
        assert_eq!(room.admit(c), (Role::Student(2), true));
    }

    #[test]
    fn test_readmit_keeps_existing_role() {
        let mut room = room();
        let (a, _ra) = outbox("a");
        let (b, _rb) = outbox("b");
        room.admit(a);
        room.admit(b.clone());

        assert_eq!(room.admit(b), (Role::Student(1), false));
        assert_eq!(room.student_count(), 1);
    }

    #[test]
    fn test_mentor_slot_is_not_a_student() {
        let mut room = room();
        let (a, _ra) = outbox("a");
        room.admit(a);

        let snapshot = room.snapshot();
        assert_eq!(snapshot.mentor, Some("a".into()));
        assert!(snapshot.students.is_empty());
        assert_eq!(room.remove(&"a".into()), Some(Role::Mentor));
        assert!(room.is_abandoned());
    }

    #[test]
    fn test_remove_unknown_connection() {
        let mut room = room();
        assert_eq!(room.remove(&"ghost".into()), None);
    }

    #[test]
    fn test_chat_history_is_capped_oldest_first() {
        let mut room = room();
        for i in 0..5 {
            room.push_message(ChatMessage {
                sender: "mentor".into(),
                message: format!("m{}", i),
            });
        }
        let texts: Vec<String> = room.history().into_iter().map(|m| m.message).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_close_ejects_everyone() {
        let mut room = room();
        let (a, _ra) = outbox("a");
        let (b, _rb) = outbox("b");
        room.admit(a);
        room.admit(b);

        let ejected = room.close();
        assert_eq!(ejected.len(), 2);
        assert!(room.is_closed());
        assert!(room.is_abandoned());
    }

    #[test]
    fn test_broadcast_reaches_mentor_and_students() {
        let mut room = room();
        let (a, mut ra) = outbox("a");
        let (b, mut rb) = outbox("b");
        room.admit(a);
        room.admit(b);

        assert_eq!(room.broadcast(&ServerEvent::StudentCount(1), None), 2);
        assert_eq!(ra.try_recv().unwrap(), ServerEvent::StudentCount(1));
        assert_eq!(rb.try_recv().unwrap(), ServerEvent::StudentCount(1));
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::Mentor.to_string(), "mentor");
        assert_eq!(Role::Student(4).to_string(), "Student 4");
        assert_eq!(serde_json::to_string(&Role::Student(1)).unwrap(), "\"Student 1\"");
    }
}
