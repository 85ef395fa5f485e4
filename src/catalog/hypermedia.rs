//! Mason documents: resource JSON plus `@namespaces` and `@controls`.

use lazy_static::lazy_static;
use serde_json::{json, Map, Value};
use url::Url;

pub const NAMESPACE: &str = "moviereviewmeta";
pub const LINK_RELATIONS: &str = "/moviereviewmeta/link-relations/";

lazy_static! {
    static ref ROOT: Url = Url::parse("http://localhost/").unwrap();
}

/// Absolute path built from `segments`, percent-encoded, with a trailing slash.
fn path(segments: &[&str]) -> String {
    let mut url = ROOT.clone();
    if let Ok(mut p) = url.path_segments_mut() {
        p.clear().extend(segments).push("");
    }
    url.path().to_string()
}

pub fn users_href() -> String {
    path(&["api", "users"])
}

pub fn user_href(username: &str) -> String {
    path(&["api", "users", username])
}

pub fn user_reviews_href(username: &str) -> String {
    path(&["api", "users", username, "reviews"])
}

pub fn current_user_href() -> String {
    path(&["api", "current-user"])
}

pub fn categories_href() -> String {
    path(&["api", "categories"])
}

pub fn category_href(id: i32) -> String {
    path(&["api", "categories", &id.to_string()])
}

pub fn movies_href() -> String {
    path(&["api", "movies"])
}

pub fn movie_href(id: i32) -> String {
    path(&["api", "movies", &id.to_string()])
}

pub fn movie_reviews_href(movie_id: i32) -> String {
    path(&["api", "movies", &movie_id.to_string(), "reviews"])
}

pub fn review_href(movie_id: i32, id: i32) -> String {
    path(&["api", "movies", &movie_id.to_string(), "reviews", &id.to_string()])
}

fn rel(name: &str) -> String {
    format!("{NAMESPACE}:{name}")
}

#[derive(Debug, Default)]
pub struct Mason {
    doc: Map<String, Value>,
    controls: Map<String, Value>,
}

impl Mason {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing JSON object; any other value lands under `items`.
    pub fn wrap(value: Value) -> Self {
        match value {
            Value::Object(doc) => Self {
                doc,
                controls: Map::new(),
            },
            other => Self::new().items(other),
        }
    }

    pub fn namespace(mut self) -> Self {
        self.doc.insert(
            "@namespaces".into(),
            json!({ NAMESPACE: { "name": LINK_RELATIONS } }),
        );
        self
    }

    pub fn control(mut self, rel: &str, href: String, title: &str) -> Self {
        self.controls
            .insert(rel.into(), json!({ "href": href, "title": title }));
        self
    }

    pub fn control_method(mut self, rel: &str, href: String, title: &str, method: &str) -> Self {
        self.controls.insert(
            rel.into(),
            json!({ "href": href, "title": title, "method": method }),
        );
        self
    }

    pub fn items(mut self, items: Value) -> Self {
        self.doc.insert("items".into(), items);
        self
    }

    pub fn build(mut self) -> Value {
        if !self.controls.is_empty() {
            self.doc.insert("@controls".into(), Value::Object(self.controls));
        }
        Value::Object(self.doc)
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn int_field(value: &Value, key: &str) -> i32 {
    value
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or_default()
}

/// Entry point served at `/`.
pub fn entry_point() -> Value {
    Mason::new()
        .namespace()
        .control(&rel("categories-all"), categories_href(), "Get a list of all categories")
        .control(&rel("movies-all"), movies_href(), "Get a list of all movies")
        .control(&rel("users-all"), users_href(), "Get a list of all users")
        .control_method(&rel("add-user"), users_href(), "Create a new user", "POST")
        .control(&rel("current-user"), current_user_href(), "Get the currently authenticated user")
        .build()
}

pub fn decorate_user(user: Value) -> Value {
    let username = str_field(&user, "username").to_string();
    Mason::wrap(user)
        .namespace()
        .control("self", user_href(&username), "Get a single user")
        .control("collection", users_href(), "Get a list of all users")
        .control(&rel("reviews-by"), user_reviews_href(&username), "Get all reviews of this user")
        .control_method("edit", user_href(&username), "Update a user", "PUT")
        .control_method(&rel("delete"), user_href(&username), "Delete a user", "DELETE")
        .build()
}

pub fn decorate_user_list(users: Value) -> Value {
    let items: Vec<Value> = match users {
        Value::Array(items) => items
            .into_iter()
            .map(|u| {
                let href = user_href(str_field(&u, "username"));
                Mason::wrap(u).control("self", href, "Get a single user").build()
            })
            .collect(),
        other => return Mason::wrap(other).namespace().build(),
    };
    Mason::new()
        .namespace()
        .items(Value::Array(items))
        .control("self", users_href(), "Get a list of all users")
        .control_method(&rel("add-user"), users_href(), "Create a new user", "POST")
        .control(&rel("current-user"), current_user_href(), "Get the currently authenticated user")
        .build()
}

pub fn decorate_category(category: Value) -> Value {
    let id = int_field(&category, "id");
    Mason::wrap(category)
        .namespace()
        .control("self", category_href(id), "Get a single category")
        .control("collection", categories_href(), "Get a list of all categories")
        .control_method("edit", category_href(id), "Update a category", "PUT")
        .control_method(&rel("delete"), category_href(id), "Delete a category", "DELETE")
        .build()
}

pub fn decorate_category_list(categories: Vec<Value>) -> Value {
    let items: Vec<Value> = categories
        .into_iter()
        .map(|c| {
            let href = category_href(int_field(&c, "id"));
            Mason::wrap(c).control("self", href, "Get a single category").build()
        })
        .collect();
    Mason::new()
        .namespace()
        .items(Value::Array(items))
        .control("self", categories_href(), "Get a list of all categories")
        .control_method(&rel("add-category"), categories_href(), "Create a new category", "POST")
        .build()
}

pub fn decorate_movie(movie: Value) -> Value {
    let id = int_field(&movie, "id");
    let category = int_field(&movie, "category_id");
    Mason::wrap(movie)
        .namespace()
        .control("self", movie_href(id), "Get a single movie")
        .control("collection", movies_href(), "Get a list of all movies")
        .control(&rel("category"), category_href(category), "Get the category of this movie")
        .control(&rel("reviews-for"), movie_reviews_href(id), "Get all reviews for this movie")
        .control_method("edit", movie_href(id), "Update a movie", "PUT")
        .control_method(&rel("delete"), movie_href(id), "Delete a movie", "DELETE")
        .build()
}

pub fn decorate_movie_list(movies: Vec<Value>) -> Value {
    let items: Vec<Value> = movies
        .into_iter()
        .map(|m| {
            let href = movie_href(int_field(&m, "id"));
            Mason::wrap(m).control("self", href, "Get a single movie").build()
        })
        .collect();
    Mason::new()
        .namespace()
        .items(Value::Array(items))
        .control("self", movies_href(), "Get a list of all movies")
        .control_method(&rel("add-movie"), movies_href(), "Create a new movie", "POST")
        .build()
}

pub fn decorate_review(review: Value) -> Value {
    let id = int_field(&review, "id");
    let movie_id = int_field(&review, "movie_id");
    let author = str_field(&review, "author").to_string();
    Mason::wrap(review)
        .namespace()
        .control("self", review_href(movie_id, id), "Get a single review")
        .control("collection", movie_reviews_href(movie_id), "Get all reviews for this movie")
        .control("author", user_href(&author), "Get the author of this review")
        .control("up", movie_href(movie_id), "Get the reviewed movie")
        .control_method("edit", review_href(movie_id, id), "Update a review", "PUT")
        .control_method(&rel("delete"), review_href(movie_id, id), "Delete a review", "DELETE")
        .build()
}

/// `self_href` is the collection being listed: a movie's or a user's reviews.
pub fn decorate_review_list(reviews: Vec<Value>, self_href: String, post_href: Option<String>) -> Value {
    let items: Vec<Value> = reviews
        .into_iter()
        .map(|r| {
            let href = review_href(int_field(&r, "movie_id"), int_field(&r, "id"));
            Mason::wrap(r).control("self", href, "Get a single review").build()
        })
        .collect();
    let mut doc = Mason::new()
        .namespace()
        .items(Value::Array(items))
        .control("self", self_href, "Get a list of reviews");
    if let Some(href) = post_href {
        doc = doc.control_method(&rel("add-review"), href, "Create a new review", "POST");
    }
    doc.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrefs_are_encoded_paths_with_trailing_slash() {
        assert_eq!(users_href(), "/api/users/");
        assert_eq!(review_href(3, 9), "/api/movies/3/reviews/9/");
        assert_eq!(user_href("a b"), "/api/users/a%20b/");
    }

    #[test]
    fn user_document_gains_controls() {
        let doc = decorate_user(json!({
            "username": "alice",
            "email_address": "alice@example.com",
            "role": "Basic User"
        }));
        assert_eq!(doc["username"], "alice");
        assert_eq!(doc["@namespaces"][NAMESPACE]["name"], LINK_RELATIONS);
        assert_eq!(doc["@controls"]["self"]["href"], "/api/users/alice/");
        assert_eq!(doc["@controls"]["edit"]["method"], "PUT");
        assert_eq!(doc["@controls"]["moviereviewmeta:delete"]["method"], "DELETE");
    }

    #[test]
    fn user_list_wraps_items() {
        let doc = decorate_user_list(json!([{ "username": "alice" }, { "username": "bob" }]));
        let items = doc["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["@controls"]["self"]["href"], "/api/users/bob/");
        assert_eq!(doc["@controls"]["moviereviewmeta:add-user"]["method"], "POST");
    }

    #[test]
    fn entry_point_links_every_collection() {
        let doc = entry_point();
        for rel in ["categories-all", "movies-all", "users-all"] {
            assert!(doc["@controls"][format!("{NAMESPACE}:{rel}")]["href"].is_string());
        }
    }
}
