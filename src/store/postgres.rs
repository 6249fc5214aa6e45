//! PostgreSQL [`ReferenceStore`] implementation over a shared `sqlx` pool.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{EtimClass, ProductClassification, UnspscCode};

use super::{ReferenceStore, SearchFilter};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const CODE_COLUMNS: &str =
    "code, title, description, segment, family, class_code, commodity, level";

/// Escape LIKE/ILIKE metacharacters so a search term always matches
/// literally, the same way the in-memory store does.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn row_to_code(row: &PgRow) -> UnspscCode {
    UnspscCode {
        code: row.get("code"),
        title: row.get("title"),
        description: row.get("description"),
        segment: row.get("segment"),
        family: row.get("family"),
        class_code: row.get("class_code"),
        commodity: row.get("commodity"),
        level: row.get("level"),
    }
}

#[async_trait]
impl ReferenceStore for PostgresStore {
    async fn get_code(&self, code: &str) -> Result<Option<UnspscCode>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM unspsc_codes WHERE code = $1",
            CODE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_code))
    }

    async fn search_codes(
        &self,
        term: &str,
        filter: &SearchFilter,
        limit: i64,
    ) -> Result<Vec<UnspscCode>> {
        let mut sql = format!(
            "SELECT {} FROM unspsc_codes \
             WHERE (title ILIKE $1 OR description ILIKE $1)",
            CODE_COLUMNS
        );
        let pattern = format!("%{}%", escape_like(term));

        let mut prefix: Option<String> = None;
        if let Some(family) = &filter.family {
            prefix = Some(format!("{}%", family));
        } else if let Some(segment) = &filter.segment {
            prefix = Some(format!("{}%", segment));
        }
        if prefix.is_some() {
            sql.push_str(" AND code LIKE $2 ORDER BY code LIMIT $3");
        } else {
            sql.push_str(" ORDER BY code LIMIT $2");
        }

        let mut query = sqlx::query(&sql).bind(&pattern);
        if let Some(p) = &prefix {
            query = query.bind(p);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_code).collect())
    }

    async fn codes_with_prefix(&self, prefix: &str, limit: i64) -> Result<Vec<UnspscCode>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM unspsc_codes WHERE code LIKE $1 ORDER BY code LIMIT $2",
            CODE_COLUMNS
        ))
        .bind(format!("{}%", prefix))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_code).collect())
    }

    async fn segment_exists(&self, segment: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM unspsc_codes WHERE segment = $1)")
                .bind(segment)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn segment_title(&self, segment: &str) -> Result<Option<String>> {
        let title: Option<String> = sqlx::query_scalar(
            "SELECT title FROM unspsc_codes WHERE segment = $1 AND level = 1 LIMIT 1",
        )
        .bind(segment)
        .fetch_optional(&self.pool)
        .await?;
        Ok(title)
    }

    async fn upsert_code(&self, record: &UnspscCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO unspsc_codes
                (code, title, description, segment, family, class_code, commodity, level, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (code) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                segment = EXCLUDED.segment,
                family = EXCLUDED.family,
                class_code = EXCLUDED.class_code,
                commodity = EXCLUDED.commodity,
                level = EXCLUDED.level,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.code)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.segment)
        .bind(&record.family)
        .bind(&record.class_code)
        .bind(&record.commodity)
        .bind(record.level)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_codes(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM unspsc_codes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_etim_class(&self, class_code: &str, version: &str) -> Result<Option<EtimClass>> {
        let row = sqlx::query(
            "SELECT class_code, version, description_en, description_de, description_fr, \
             parent_class FROM etim_classes WHERE class_code = $1 AND version = $2",
        )
        .bind(class_code)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| EtimClass {
            class_code: r.get("class_code"),
            version: r.get("version"),
            description_en: r.get("description_en"),
            description_de: r.get("description_de"),
            description_fr: r.get("description_fr"),
            parent_class: r.get("parent_class"),
        }))
    }

    async fn upsert_etim_class(&self, record: &EtimClass) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO etim_classes
                (class_code, version, description_en, description_de, description_fr,
                 parent_class, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (class_code, version) DO UPDATE SET
                description_en = EXCLUDED.description_en,
                description_de = EXCLUDED.description_de,
                description_fr = EXCLUDED.description_fr,
                parent_class = EXCLUDED.parent_class,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.class_code)
        .bind(&record.version)
        .bind(&record.description_en)
        .bind(&record.description_de)
        .bind(&record.description_fr)
        .bind(&record.parent_class)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_etim_classes(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM etim_classes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn upsert_classification(&self, record: &ProductClassification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_classifications
                (product_id, unspsc_code, etim_class, confidence, method,
                 classified_at, classified_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (product_id, COALESCE(unspsc_code, ''), COALESCE(etim_class, ''))
            DO UPDATE SET
                confidence = EXCLUDED.confidence,
                method = EXCLUDED.method,
                classified_at = EXCLUDED.classified_at,
                classified_by = EXCLUDED.classified_by
            "#,
        )
        .bind(&record.product_id)
        .bind(&record.unspsc_code)
        .bind(&record.etim_class)
        .bind(record.confidence)
        .bind(&record.method)
        .bind(record.classified_at)
        .bind(&record.classified_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_metacharacters_match_literally() {
        assert_eq!(escape_like("drill"), "drill");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("class_code"), "class\\_code");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
