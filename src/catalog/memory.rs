use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    models::{Category, CategoryBody, Movie, MovieBody, Review, ReviewBody},
    repo::CatalogStore,
};
use crate::store::{StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    categories: BTreeMap<i32, Category>,
    movies: BTreeMap<i32, Movie>,
    reviews: BTreeMap<i32, Review>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_category(&self, id: i32) -> StoreResult<()> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "category {id} referenced by movie does not exist"
            )))
        }
    }

    fn ensure_movie(&self, id: i32) -> StoreResult<()> {
        if self.movies.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "movie {id} referenced by review does not exist"
            )))
        }
    }
}

/// In-process [`CatalogStore`] with the same referential rules as the
/// catalog schema.
#[derive(Default)]
pub struct MemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.tables.read().await.categories.values().cloned().collect())
    }

    async fn find_category(&self, id: i32) -> StoreResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn insert_category(&self, body: &CategoryBody) -> StoreResult<Category> {
        let mut t = self.tables.write().await;
        let category = Category {
            id: t.next_id(),
            title: body.title.clone(),
        };
        t.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i32, body: &CategoryBody) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.categories.get_mut(&id) {
            Some(c) => {
                c.title = body.title.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(&self, id: i32) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if !t.categories.contains_key(&id) {
            return Ok(false);
        }
        if t.movies.values().any(|m| m.category_id == id) {
            return Err(StoreError::Conflict(format!(
                "category {id} is still referenced by movies"
            )));
        }
        t.categories.remove(&id);
        Ok(true)
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        Ok(self.tables.read().await.movies.values().cloned().collect())
    }

    async fn find_movie(&self, id: i32) -> StoreResult<Option<Movie>> {
        Ok(self.tables.read().await.movies.get(&id).cloned())
    }

    async fn insert_movie(&self, body: &MovieBody) -> StoreResult<Movie> {
        let mut t = self.tables.write().await;
        t.ensure_category(body.category_id)?;
        let movie = Movie {
            id: t.next_id(),
            title: body.title.clone(),
            director: body.director.clone(),
            length: body.length,
            release_date: body.release_date,
            category_id: body.category_id,
        };
        t.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn update_movie(&self, id: i32, body: &MovieBody) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if !t.movies.contains_key(&id) {
            return Ok(false);
        }
        t.ensure_category(body.category_id)?;
        if let Some(m) = t.movies.get_mut(&id) {
            m.title = body.title.clone();
            m.director = body.director.clone();
            m.length = body.length;
            m.release_date = body.release_date;
            m.category_id = body.category_id;
        }
        Ok(true)
    }

    async fn delete_movie(&self, id: i32) -> StoreResult<Option<Vec<Review>>> {
        let mut t = self.tables.write().await;
        if t.movies.remove(&id).is_none() {
            return Ok(None);
        }
        let gone: Vec<i32> = t
            .reviews
            .values()
            .filter(|r| r.movie_id == id)
            .map(|r| r.id)
            .collect();
        Ok(Some(gone.iter().filter_map(|rid| t.reviews.remove(rid)).collect()))
    }

    async fn list_reviews_for_movie(&self, movie_id: i32) -> StoreResult<Vec<Review>> {
        let t = self.tables.read().await;
        Ok(t.reviews
            .values()
            .filter(|r| r.movie_id == movie_id)
            .cloned()
            .collect())
    }

    async fn list_reviews_by_author(&self, author: &str) -> StoreResult<Vec<Review>> {
        let t = self.tables.read().await;
        Ok(t.reviews
            .values()
            .filter(|r| r.author == author)
            .cloned()
            .collect())
    }

    async fn find_review(&self, id: i32) -> StoreResult<Option<Review>> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn insert_review(&self, body: &ReviewBody) -> StoreResult<Review> {
        let mut t = self.tables.write().await;
        t.ensure_movie(body.movie_id)?;
        let review = Review {
            id: t.next_id(),
            rating: body.rating,
            comment: body.comment.clone(),
            date: body.date,
            author: body.author.clone(),
            movie_id: body.movie_id,
        };
        t.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn update_review(&self, id: i32, body: &ReviewBody) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.reviews.get_mut(&id) {
            Some(r) => {
                r.rating = body.rating;
                r.comment = body.comment.clone();
                r.date = body.date;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_review(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }
}
