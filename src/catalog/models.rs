use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::extract::Validate;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBody {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub director: String,
    pub length: i32, // seconds
    #[serde(with = "iso_date")]
    pub release_date: Date,
    pub category_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieBody {
    pub title: String,
    pub director: String,
    pub length: i32,
    #[serde(with = "iso_date")]
    pub release_date: Date,
    pub category_id: i32,
}

/// A review; `author` is the username of the identity that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i32,
    pub rating: i32,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub author: String,
    pub movie_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewBody {
    pub rating: i32,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub author: String,
    pub movie_id: i32,
}

fn non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("'{field}' must not be empty"));
    }
    Ok(())
}

impl Validate for CategoryBody {
    fn validate(&self) -> Result<(), String> {
        non_blank("title", &self.title)
    }
}

impl Validate for MovieBody {
    fn validate(&self) -> Result<(), String> {
        non_blank("title", &self.title)?;
        non_blank("director", &self.director)?;
        if self.length < 1 {
            return Err(format!("'length' must be at least 1, got {}", self.length));
        }
        Ok(())
    }
}

impl Validate for ReviewBody {
    fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err(format!("'rating' must be between 1 and 5, got {}", self.rating));
        }
        non_blank("author", &self.author)
    }
}
