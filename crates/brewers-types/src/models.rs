use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Descriptions longer than this are cut when rendered as a summary.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Appended to a truncated summary.
pub const SUMMARY_ELLIPSIS: &str = "...";

pub const MIN_RATING: i64 = 0;
pub const MAX_RATING: i64 = 100;

// -- Users --

/// Full profile, only ever returned to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What other users get to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
}

// -- Batches --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchType {
    Beer,
    Wine,
    Mead,
    Cider,
    Other,
}

impl BatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beer => "Beer",
            Self::Wine => "Wine",
            Self::Mead => "Mead",
            Self::Cider => "Cider",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beer" => Ok(Self::Beer),
            "Wine" => Ok(Self::Wine),
            "Mead" => Ok(Self::Mead),
            "Cider" => Ok(Self::Cider),
            "Other" => Ok(Self::Other),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub batch_type: BatchType,
    pub created_at: DateTime<Utc>,
}

// -- Ratings --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRating {
    pub batch_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Mean of `ratings` rounded to one decimal place. No ratings is an explicit zero.
pub fn average_rating(ratings: &[i64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    let sum: i64 = ratings.iter().sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub fn rating_in_range(rating: i64) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

// -- Actions --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Brew,
    Ferment,
    Rack,
    Bottle,
    Other,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brew => "Brew",
            Self::Ferment => "Ferment",
            Self::Rack => "Rack",
            Self::Bottle => "Bottle",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Brew" => Ok(Self::Brew),
            "Ferment" => Ok(Self::Ferment),
            "Rack" => Ok(Self::Rack),
            "Bottle" => Ok(Self::Bottle),
            "Other" => Ok(Self::Other),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAction {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub performer_id: Uuid,
    pub title: String,
    pub description: String,
    pub action_type: ActionType,
    pub summary: String,
    pub performed_at: DateTime<Utc>,
}

/// Preview of a long description. Counts Unicode scalar values, never bytes,
/// so the cut always lands on a character boundary.
pub fn summary_text(description: &str) -> String {
    match description.char_indices().nth(SUMMARY_MAX_CHARS) {
        None => description.to_string(),
        Some((cut, _)) => {
            let mut summary = String::with_capacity(cut + SUMMARY_ELLIPSIS.len());
            summary.push_str(&description[..cut]);
            summary.push_str(SUMMARY_ELLIPSIS);
            summary
        }
    }
}

// -- Notes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNote {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// -- Containers --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub volume: Option<f64>,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Container {
    /// Containers are visible to every signed-in user.
    pub fn can_view(&self, _user_id: Uuid) -> bool {
        true
    }

    pub fn can_edit(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

// -- Recipes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub style: Option<String>,
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_known_ratings() {
        assert_eq!(average_rating(&[2, 5, 100, 30, 70]), 41.4);
    }

    #[test]
    fn average_without_ratings_is_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        // 10 / 3 = 3.333...
        assert_eq!(average_rating(&[1, 2, 7]), 3.3);
        // 17 / 3 = 5.666...
        assert_eq!(average_rating(&[5, 6, 6]), 5.7);
        assert_eq!(average_rating(&[100]), 100.0);
    }

    #[test]
    fn short_description_is_kept_verbatim() {
        assert_eq!(summary_text("desc"), "desc");
        assert_eq!(summary_text(""), "");

        let exact = "x".repeat(SUMMARY_MAX_CHARS);
        assert_eq!(summary_text(&exact), exact);
    }

    #[test]
    fn long_description_is_truncated_to_203_chars() {
        let mut long = String::new();
        while long.chars().count() <= SUMMARY_MAX_CHARS {
            long.push_str("This is a very very very long string it is very long. ");
        }

        let summary = summary_text(&long);
        assert_eq!(summary.chars().count(), 203);
        assert!(summary.ends_with("..."));
        assert_eq!(&summary[..200], &long[..200]);
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let long = "ü".repeat(250);
        let summary = summary_text(&long);
        assert_eq!(summary.chars().count(), 203);
        assert!(summary.starts_with(&"ü".repeat(200)));
    }

    #[test]
    fn only_owner_can_edit_container() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let container = Container {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            owner_id: owner,
            name: "Carboy".into(),
            volume: Some(5.0),
            unit: Some("gal".into()),
            created_at: Utc::now(),
        };

        assert!(container.can_edit(owner));
        assert!(!container.can_edit(stranger));
        assert!(container.can_view(stranger));
    }

    #[test]
    fn batch_type_parses_its_own_names() {
        for t in [BatchType::Beer, BatchType::Wine, BatchType::Mead, BatchType::Cider, BatchType::Other] {
            assert_eq!(t.as_str().parse::<BatchType>(), Ok(t));
        }
        assert!("Whisky".parse::<BatchType>().is_err());
    }

    #[test]
    fn rating_bounds() {
        assert!(rating_in_range(0));
        assert!(rating_in_range(100));
        assert!(!rating_in_range(-1));
        assert!(!rating_in_range(101));
    }
}
