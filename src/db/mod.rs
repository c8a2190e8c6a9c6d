//! SQLite persistence of a built snapshot, in the table shapes the
//! presentation layer reads: `name`, `match`, and one fact table per
//! dataset. Rebuilds replace tables wholesale inside one transaction.

use std::str::FromStr;

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::DbError;
use crate::snapshot::Snapshot;

pub async fn make_pool(path: &str) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
        .map_err(|e| DbError::Connection(format!("invalid sqlite path {path}: {e}")))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(|e| DbError::Connection(format!("opening {path}: {e}")))?;
    Ok(pool)
}

/// Quote an identifier that may come from a config-supplied dataset tag or
/// a raw CSV header.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub async fn save_snapshot(pool: &SqlitePool, snapshot: &Snapshot) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    // Canonical entity table.
    sqlx::query("DROP TABLE IF EXISTS \"name\"")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "CREATE TABLE \"name\" (
            company_id INTEGER PRIMARY KEY,
            \"NAME1\" TEXT,
            \"NAME2\" TEXT,
            \"ADDRESS\" TEXT,
            \"DISPLAY_NAME1\" TEXT,
            \"DISPLAY_NAME2\" TEXT,
            \"DISPLAY_ADDRESS\" TEXT
        )",
    )
    .execute(&mut *tx)
    .await?;
    for entity in &snapshot.entities {
        sqlx::query(
            "INSERT INTO \"name\" VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(entity.company_id)
        .bind(&entity.name)
        .bind(&entity.alt_name)
        .bind(&entity.address)
        .bind(&entity.display_name)
        .bind(&entity.display_alt_name)
        .bind(&entity.display_address)
        .execute(&mut *tx)
        .await?;
    }

    // Match adjacency.
    sqlx::query("DROP TABLE IF EXISTS \"match\"")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "CREATE TABLE \"match\" (
            match_id INTEGER PRIMARY KEY,
            company_id INTEGER NOT NULL,
            company_match INTEGER NOT NULL
        )",
    )
    .execute(&mut *tx)
    .await?;
    for (match_id, company_id, company_match) in snapshot.match_rows() {
        sqlx::query("INSERT INTO \"match\" VALUES (?1, ?2, ?3)")
            .bind(match_id)
            .bind(company_id)
            .bind(company_match)
            .execute(&mut *tx)
            .await?;
    }

    // Per-dataset fact tables: foreign key plus original payload columns.
    for (tag, fact) in &snapshot.facts {
        let table = quote_ident(tag);
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut *tx)
            .await?;
        let mut ddl_cols = vec!["company_id INTEGER NOT NULL".to_string()];
        ddl_cols.extend(fact.columns.iter().map(|c| format!("{} TEXT", quote_ident(c))));
        sqlx::query(&format!("CREATE TABLE {table} ({})", ddl_cols.join(", ")))
            .execute(&mut *tx)
            .await?;
        let placeholders: Vec<String> =
            (1..=fact.columns.len() + 1).map(|i| format!("?{i}")).collect();
        let insert = format!("INSERT INTO {table} VALUES ({})", placeholders.join(", "));
        for row in &fact.rows {
            let mut query = sqlx::query(&insert).bind(row.company_id);
            for value in &row.values {
                query = query.bind(cell_text(value));
            }
            query.execute(&mut *tx).await?;
        }
    }

    tx.commit().await?;
    log::info!(
        "persisted snapshot: {} entities, {} match rows, {} fact tables",
        snapshot.entities.len(),
        snapshot.edge_count(),
        snapshot.facts.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchPolicy;
    use crate::models::{NamedDataset, RawTable};
    use crate::snapshot::build;
    use serde_json::json;
    use sqlx::Row;

    fn toy_snapshot() -> Snapshot {
        let ds = NamedDataset {
            tag: "REGISTRY".into(),
            table: RawTable {
                columns: vec!["NAME1".into(), "ADDRESS".into(), "phone".into()],
                rows: vec![
                    vec![json!("Acme Construction"), json!("10 Main St"), json!("555")],
                    vec![json!("acme construction"), json!("10 main st"), json!(null)],
                    vec![json!("Borough Builders"), json!(""), json!("556")],
                ],
            },
            name_columns: vec!["NAME1".into()],
            address_column: "ADDRESS".into(),
        };
        build(&[ds], &MatchPolicy::build_default()).unwrap()
    }

    #[tokio::test]
    async fn test_save_snapshot_roundtrip_counts() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let snapshot = toy_snapshot();
        save_snapshot(&pool, &snapshot).await.unwrap();

        let names: i64 = sqlx::query("SELECT COUNT(*) AS n FROM \"name\"")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(names as usize, snapshot.entities.len());

        let matches: i64 = sqlx::query("SELECT COUNT(*) AS n FROM \"match\"")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(matches as usize, snapshot.edge_count());

        // Fact rows carry the foreign key and payload.
        let row = sqlx::query(
            "SELECT company_id, \"phone\" FROM \"REGISTRY\" ORDER BY rowid LIMIT 1",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let company_id: i64 = row.get("company_id");
        let phone: Option<String> = row.get("phone");
        assert_eq!(company_id, 0);
        assert_eq!(phone.as_deref(), Some("555"));
    }

    #[tokio::test]
    async fn test_save_snapshot_replaces_tables() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let snapshot = toy_snapshot();
        save_snapshot(&pool, &snapshot).await.unwrap();
        save_snapshot(&pool, &snapshot).await.unwrap();
        let names: i64 = sqlx::query("SELECT COUNT(*) AS n FROM \"name\"")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(names as usize, snapshot.entities.len());
    }
}
