//! Database row types: these map directly to SQLite rows.
//! Distinct from brewers-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub created_at: String,
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub zip: Option<&'a str>,
}

pub struct ProfileUpdate<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub zip: Option<&'a str>,
}

/// Substring filters; `None` fields are ignored.
#[derive(Default)]
pub struct UserSearch<'a> {
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub zip: Option<&'a str>,
}

pub struct BatchRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub batch_type: String,
    pub created_at: String,
}

pub struct RatingRow {
    pub batch_id: String,
    pub user_id: String,
    pub username: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

pub struct ActionRow {
    pub id: String,
    pub batch_id: String,
    pub performer_id: String,
    pub title: String,
    pub description: String,
    pub action_type: String,
    pub performed_at: String,
}

pub struct NoteRow {
    pub id: String,
    pub batch_id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
}

pub struct ContainerRow {
    pub id: String,
    pub batch_id: String,
    pub owner_id: String,
    pub name: String,
    pub volume: Option<f64>,
    pub unit: Option<String>,
    pub created_at: String,
}

pub struct RecipeRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub style: Option<String>,
    pub instructions: Option<String>,
    pub created_at: String,
}
