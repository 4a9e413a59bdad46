//! Row to API model conversion. Rows hold TEXT ids and SQLite timestamps;
//! corrupt values are logged and replaced rather than failing the request.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use brewers_db::models::{
    ActionRow, BatchRow, ContainerRow, NoteRow, RatingRow, RecipeRow, UserRow,
};
use brewers_types::models::{
    ActionType, Batch, BatchAction, BatchNote, BatchRating, BatchType, Container, PublicUser,
    Recipe, User, summary_text,
};

pub fn parse_id(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}

pub fn user(row: UserRow) -> User {
    User {
        id: parse_id(&row.id, "user id"),
        username: row.username,
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        city: row.city,
        state: row.state,
        zip: row.zip,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn public_user(row: UserRow) -> PublicUser {
    PublicUser {
        id: parse_id(&row.id, "user id"),
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        city: row.city,
        state: row.state,
    }
}

pub fn batch(row: BatchRow) -> Batch {
    let batch_type = row.batch_type.parse().unwrap_or_else(|e| {
        warn!("Batch {}: {}", row.id, e);
        BatchType::Other
    });

    Batch {
        id: parse_id(&row.id, "batch id"),
        owner_id: parse_id(&row.owner_id, "batch owner_id"),
        name: row.name,
        batch_type,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn rating(row: RatingRow) -> BatchRating {
    BatchRating {
        batch_id: parse_id(&row.batch_id, "rating batch_id"),
        user_id: parse_id(&row.user_id, "rating user_id"),
        username: row.username,
        rating: row.rating,
        comment: row.comment,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn action(row: ActionRow) -> BatchAction {
    let action_type = row.action_type.parse().unwrap_or_else(|e| {
        warn!("Action {}: {}", row.id, e);
        ActionType::Other
    });

    BatchAction {
        id: parse_id(&row.id, "action id"),
        batch_id: parse_id(&row.batch_id, "action batch_id"),
        performer_id: parse_id(&row.performer_id, "action performer_id"),
        summary: summary_text(&row.description),
        title: row.title,
        description: row.description,
        action_type,
        performed_at: parse_timestamp(&row.performed_at),
    }
}

pub fn note(row: NoteRow) -> BatchNote {
    BatchNote {
        id: parse_id(&row.id, "note id"),
        batch_id: parse_id(&row.batch_id, "note batch_id"),
        author_id: parse_id(&row.author_id, "note author_id"),
        title: row.title,
        body: row.body,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn container(row: ContainerRow) -> Container {
    Container {
        id: parse_id(&row.id, "container id"),
        batch_id: parse_id(&row.batch_id, "container batch_id"),
        owner_id: parse_id(&row.owner_id, "container owner_id"),
        name: row.name,
        volume: row.volume,
        unit: row.unit,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn recipe(row: RecipeRow) -> Recipe {
    Recipe {
        id: parse_id(&row.id, "recipe id"),
        owner_id: parse_id(&row.owner_id, "recipe owner_id"),
        name: row.name,
        style: row.style,
        instructions: row.instructions,
        created_at: parse_timestamp(&row.created_at),
    }
}
