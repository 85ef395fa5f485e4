use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Category, CategoryBody, Movie, MovieBody, Review, ReviewBody};
use crate::store::StoreResult;

/// Persistence for catalog resources. Every call is atomic on its own
/// record; referential violations fail with `StoreError::Conflict`.
/// Deleting a movie removes its reviews; deleting a category that still
/// has movies is a conflict.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn find_category(&self, id: i32) -> StoreResult<Option<Category>>;
    async fn insert_category(&self, body: &CategoryBody) -> StoreResult<Category>;
    async fn update_category(&self, id: i32, body: &CategoryBody) -> StoreResult<bool>;
    async fn delete_category(&self, id: i32) -> StoreResult<bool>;

    async fn list_movies(&self) -> StoreResult<Vec<Movie>>;
    async fn find_movie(&self, id: i32) -> StoreResult<Option<Movie>>;
    async fn insert_movie(&self, body: &MovieBody) -> StoreResult<Movie>;
    async fn update_movie(&self, id: i32, body: &MovieBody) -> StoreResult<bool>;
    /// Removes the movie and its reviews in one write. Returns the reviews
    /// that went with it, or `None` if the movie did not exist.
    async fn delete_movie(&self, id: i32) -> StoreResult<Option<Vec<Review>>>;

    async fn list_reviews_for_movie(&self, movie_id: i32) -> StoreResult<Vec<Review>>;
    async fn list_reviews_by_author(&self, author: &str) -> StoreResult<Vec<Review>>;
    async fn find_review(&self, id: i32) -> StoreResult<Option<Review>>;
    async fn insert_review(&self, body: &ReviewBody) -> StoreResult<Review>;
    /// Overwrites rating, comment and date; author and movie are fixed.
    async fn update_review(&self, id: i32, body: &ReviewBody) -> StoreResult<bool>;
    async fn delete_review(&self, id: i32) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgCatalogStore {
    db: PgPool,
}

impl PgCatalogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, title FROM categories ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn find_category(&self, id: i32) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>("SELECT id, title FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn insert_category(&self, body: &CategoryBody) -> StoreResult<Category> {
        let row = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (title) VALUES ($1) RETURNING id, title",
        )
        .bind(&body.title)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_category(&self, id: i32, body: &CategoryBody) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE categories SET title = $2 WHERE id = $1")
            .bind(id)
            .bind(&body.title)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_category(&self, id: i32) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, director, length, release_date, category_id
            FROM movies
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_movie(&self, id: i32) -> StoreResult<Option<Movie>> {
        let row = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, director, length, release_date, category_id
            FROM movies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_movie(&self, body: &MovieBody) -> StoreResult<Movie> {
        let row = sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (title, director, length, release_date, category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, director, length, release_date, category_id
            "#,
        )
        .bind(&body.title)
        .bind(&body.director)
        .bind(body.length)
        .bind(body.release_date)
        .bind(body.category_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_movie(&self, id: i32, body: &MovieBody) -> StoreResult<bool> {
        let done = sqlx::query(
            r#"
            UPDATE movies
               SET title = $2, director = $3, length = $4, release_date = $5, category_id = $6
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&body.title)
        .bind(&body.director)
        .bind(body.length)
        .bind(body.release_date)
        .bind(body.category_id)
        .execute(&self.db)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_movie(&self, id: i32) -> StoreResult<Option<Vec<Review>>> {
        let mut tx = self.db.begin().await?;
        // Row lock holds back review inserts until the movie is gone.
        let found = sqlx::query_scalar::<_, i32>("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Ok(None);
        }
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            DELETE FROM reviews
            WHERE movie_id = $1
            RETURNING id, rating, comment, date, author, movie_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(reviews))
    }

    async fn list_reviews_for_movie(&self, movie_id: i32) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, rating, comment, date, author, movie_id
            FROM reviews
            WHERE movie_id = $1
            ORDER BY date DESC, id
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_reviews_by_author(&self, author: &str) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, rating, comment, date, author, movie_id
            FROM reviews
            WHERE author = $1
            ORDER BY date DESC, id
            "#,
        )
        .bind(author)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_review(&self, id: i32) -> StoreResult<Option<Review>> {
        let row = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, rating, comment, date, author, movie_id
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_review(&self, body: &ReviewBody) -> StoreResult<Review> {
        let row = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (rating, comment, date, author, movie_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, rating, comment, date, author, movie_id
            "#,
        )
        .bind(body.rating)
        .bind(&body.comment)
        .bind(body.date)
        .bind(&body.author)
        .bind(body.movie_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_review(&self, id: i32, body: &ReviewBody) -> StoreResult<bool> {
        let done = sqlx::query(
            r#"
            UPDATE reviews
               SET rating = $2, comment = $3, date = $4
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(body.rating)
        .bind(&body.comment)
        .bind(body.date)
        .execute(&self.db)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_review(&self, id: i32) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
