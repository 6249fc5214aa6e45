use anyhow::Result;
use sqlx::PgPool;

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    // Reference table for UNSPSC codes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS unspsc_codes (
            code TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            segment TEXT,
            family TEXT,
            class_code TEXT,
            commodity TEXT,
            level INTEGER NOT NULL,
            updated_at BIGINT NOT NULL DEFAULT 0,
            CHECK (char_length(code) = 8),
            CHECK (level BETWEEN 1 AND 4)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Reference table for ETIM classes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS etim_classes (
            class_code TEXT NOT NULL,
            version TEXT NOT NULL,
            description_en TEXT NOT NULL,
            description_de TEXT,
            description_fr TEXT,
            parent_class TEXT,
            updated_at BIGINT NOT NULL DEFAULT 0,
            PRIMARY KEY (class_code, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Join table for product classifications
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_classifications (
            id BIGSERIAL PRIMARY KEY,
            product_id TEXT NOT NULL,
            unspsc_code TEXT REFERENCES unspsc_codes(code),
            etim_class TEXT,
            confidence DOUBLE PRECISION NOT NULL,
            method TEXT NOT NULL,
            classified_at BIGINT NOT NULL,
            classified_by TEXT NOT NULL,
            CHECK (confidence >= 0 AND confidence <= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Upsert identity: a product may carry one row per (code, class) pair.
    // NULLs never conflict in a plain unique constraint, so the index is
    // built over COALESCEd expressions.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_product_classifications_identity
        ON product_classifications
            (product_id, COALESCE(unspsc_code, ''), COALESCE(etim_class, ''))
        "#,
    )
    .execute(pool)
    .await?;

    // Supporting indexes for hierarchy and search queries
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_unspsc_codes_level ON unspsc_codes(level)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_unspsc_codes_segment ON unspsc_codes(segment)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_unspsc_codes_prefix \
         ON unspsc_codes(code text_pattern_ops)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_unspsc_codes_fts
        ON unspsc_codes
        USING GIN (to_tsvector('english', title || ' ' || COALESCE(description, '')))
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_etim_classes_version ON etim_classes(version)",
    )
    .execute(pool)
    .await?;

    // Parent references form a tree; deleting a parent orphans children
    // to NULL rather than cascading. SET NULL with a column list (needed
    // to keep the NOT NULL version column intact) is PostgreSQL 15+
    // syntax; older servers skip the constraint instead of failing init,
    // and the importer's format checks still keep parents well-formed.
    sqlx::query(
        r#"
        DO $$
        BEGIN
            IF current_setting('server_version_num')::int >= 150000
               AND NOT EXISTS (
                   SELECT 1 FROM pg_constraint WHERE conname = 'fk_etim_parent'
               )
            THEN
                ALTER TABLE etim_classes
                    ADD CONSTRAINT fk_etim_parent
                    FOREIGN KEY (parent_class, version)
                    REFERENCES etim_classes (class_code, version)
                    ON DELETE SET NULL (parent_class);
            END IF;
        END $$
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
