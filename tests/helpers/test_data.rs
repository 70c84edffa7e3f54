//! Test data helpers for creating test objects
//!
//! Builders for events, users and registration requests. Free-text fields are
//! filled with `fake` so tests never depend on particular titles or names.

use chrono::{DateTime, Duration, Utc};
use fake::faker::address::en::StreetName;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use uuid::Uuid;
use goloop::models::{
    City, CompletionStatus, CreateEventRequest, Event, EventId, EventStatus, RegisterParticipantRequest, User, UserRole,
};

pub const ORGANIZER_ID: &str = "organizer";
pub const ADMIN_ID: &str = "admin";

/// Builder for stored events
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// Approved event one day in the future with room for ten
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            event: Event {
                id: Uuid::new_v4(),
                title: Sentence(2..5).fake(),
                organizer: CompanyName().fake(),
                location: City::Jakarta,
                location_detail: StreetName().fake(),
                description: Sentence(5..12).fake(),
                image_url: None,
                date_time: now + Duration::days(1),
                capacity: 10,
                registered: 0,
                status: EventStatus::Approved,
                completion_status: CompletionStatus::AwaitingProof,
                completion_proof_image_url: None,
                points_distributed: false,
                organizer_points: 3,
                participant_points: 1,
                creator_id: ORGANIZER_ID.to_string(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.event.status = status;
        self
    }

    pub fn completion(mut self, completion: CompletionStatus) -> Self {
        self.event.completion_status = completion;
        if completion != CompletionStatus::AwaitingProof {
            self.event.completion_proof_image_url = Some("https://img.example/proof.jpg".to_string());
        }
        self
    }

    pub fn capacity(mut self, capacity: i32) -> Self {
        self.event.capacity = capacity;
        self
    }

    pub fn registered(mut self, registered: i32) -> Self {
        self.event.registered = registered;
        self
    }

    pub fn location(mut self, location: City) -> Self {
        self.event.location = location;
        self
    }

    pub fn starts_at(mut self, date_time: DateTime<Utc>) -> Self {
        self.event.date_time = date_time;
        self
    }

    /// Event that started the given number of hours ago
    pub fn passed(self, hours: i64) -> Self {
        self.starts_at(Utc::now() - Duration::hours(hours))
    }

    pub fn creator(mut self, creator_id: &str) -> Self {
        self.event.creator_id = creator_id.to_string();
        self
    }

    pub fn awards(mut self, organizer_points: i32, participant_points: i32) -> Self {
        self.event.organizer_points = organizer_points;
        self.event.participant_points = participant_points;
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Valid creation request for an event next week
pub fn create_event_request() -> CreateEventRequest {
    CreateEventRequest {
        title: Sentence(2..5).fake(),
        organizer: CompanyName().fake(),
        location: City::Bandung,
        location_detail: StreetName().fake(),
        description: Sentence(5..12).fake(),
        image_url: None,
        date_time: Utc::now() + Duration::days(7),
        capacity: 20,
    }
}

pub fn test_user(uid: &str, role: UserRole) -> User {
    let now = Utc::now();
    User {
        uid: uid.to_string(),
        display_name: Some(Name().fake()),
        email: Some(format!("{}@goloop.test", uid)),
        photo_url: None,
        location: None,
        role,
        points: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn registration_request(event_id: EventId, user_id: &str) -> RegisterParticipantRequest {
    RegisterParticipantRequest {
        event_id,
        user_id: user_id.to_string(),
        display_name: Some(Name().fake()),
        photo_url: None,
    }
}
