use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ObjectiveRecord, ObjectiveStatus, SnapshotRecord, TargetDirection};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let objectives = vec![
        (
            Uuid::parse_str("8f2c1b36-5a44-4f4e-9a2d-1c6b0d9e4f01")?,
            "Grow delivery revenue",
            "Blue Finch Bistro",
            "monthly_delivery_revenue",
            "USD",
            Some(30000.0),
            Some(50000.0),
            "increase",
            NaiveDate::from_ymd_opt(2026, 1, 5).context("invalid date")?,
            NaiveDate::from_ymd_opt(2026, 4, 5).context("invalid date")?,
        ),
        (
            Uuid::parse_str("4a9e7d20-93cd-48a1-b1f7-52d84e6c3b72")?,
            "Cut food cost percentage",
            "Blue Finch Bistro",
            "food_cost_pct",
            "%",
            Some(38.0),
            Some(30.0),
            "decrease",
            NaiveDate::from_ymd_opt(2026, 1, 12).context("invalid date")?,
            NaiveDate::from_ymd_opt(2026, 3, 31).context("invalid date")?,
        ),
        (
            Uuid::parse_str("c1d4f8aa-7e02-4b63-8c55-9ab310f2d4e9")?,
            "Hold average ticket steady",
            "Harbor & Vine",
            "avg_ticket",
            "USD",
            Some(42.0),
            Some(42.0),
            "maintain",
            NaiveDate::from_ymd_opt(2026, 2, 1).context("invalid date")?,
            NaiveDate::from_ymd_opt(2026, 5, 1).context("invalid date")?,
        ),
    ];

    for (id, name, restaurant, kpi_name, kpi_unit, baseline, target, direction, start, deadline) in
        objectives
    {
        sqlx::query(
            r#"
            INSERT INTO objective_progress.objectives
            (id, name, restaurant, kpi_name, kpi_unit, baseline_value, target_value,
             direction, baseline_date, evaluation_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'in_progress')
            ON CONFLICT (name) DO UPDATE
            SET restaurant = EXCLUDED.restaurant,
                baseline_value = EXCLUDED.baseline_value,
                target_value = EXCLUDED.target_value,
                direction = EXCLUDED.direction,
                baseline_date = EXCLUDED.baseline_date,
                evaluation_date = EXCLUDED.evaluation_date
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(restaurant)
        .bind(kpi_name)
        .bind(kpi_unit)
        .bind(baseline)
        .bind(target)
        .bind(direction)
        .bind(start)
        .bind(deadline)
        .execute(pool)
        .await?;
    }

    let snapshots = vec![
        (
            "seed-001",
            "Grow delivery revenue",
            NaiveDate::from_ymd_opt(2026, 1, 19).context("invalid date")?,
            33500.0,
        ),
        (
            "seed-002",
            "Grow delivery revenue",
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
            35000.0,
        ),
        (
            "seed-003",
            "Grow delivery revenue",
            NaiveDate::from_ymd_opt(2026, 2, 16).context("invalid date")?,
            37200.0,
        ),
        (
            "seed-004",
            "Cut food cost percentage",
            NaiveDate::from_ymd_opt(2026, 1, 26).context("invalid date")?,
            36.5,
        ),
        (
            "seed-005",
            "Cut food cost percentage",
            NaiveDate::from_ymd_opt(2026, 2, 9).context("invalid date")?,
            34.8,
        ),
        (
            "seed-006",
            "Hold average ticket steady",
            NaiveDate::from_ymd_opt(2026, 2, 15).context("invalid date")?,
            41.3,
        ),
    ];

    for (source_key, objective_name, snapshot_date, kpi_value) in snapshots {
        let objective_id: Uuid = sqlx::query(
            "SELECT id FROM objective_progress.objectives WHERE name = $1",
        )
        .bind(objective_name)
        .fetch_one(pool)
        .await?
        .get("id");

        sqlx::query(
            r#"
            INSERT INTO objective_progress.snapshots
            (id, objective_id, kpi_value, snapshot_date, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(objective_id)
        .bind(kpi_value)
        .bind(snapshot_date)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn objective_from_row(row: &sqlx::postgres::PgRow) -> ObjectiveRecord {
    let direction: String = row.get("direction");
    let status: String = row.get("status");
    ObjectiveRecord {
        id: row.get("id"),
        name: row.get("name"),
        restaurant: row.get("restaurant"),
        kpi_name: row.get("kpi_name"),
        kpi_unit: row.get("kpi_unit"),
        baseline_value: row.get("baseline_value"),
        target_value: row.get("target_value"),
        direction: TargetDirection::parse(&direction),
        baseline_date: row.get("baseline_date"),
        evaluation_date: row.get("evaluation_date"),
        status: ObjectiveStatus::parse(&status),
    }
}

pub async fn fetch_objective(pool: &PgPool, id: Uuid) -> anyhow::Result<ObjectiveRecord> {
    let row = sqlx::query(
        "SELECT id, name, restaurant, kpi_name, kpi_unit, baseline_value, target_value, \
         direction, baseline_date, evaluation_date, status \
         FROM objective_progress.objectives WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no objective with id {id}"))?;

    Ok(objective_from_row(&row))
}

pub async fn fetch_objectives(
    pool: &PgPool,
    restaurant: Option<&str>,
) -> anyhow::Result<Vec<ObjectiveRecord>> {
    let mut query = String::from(
        "SELECT id, name, restaurant, kpi_name, kpi_unit, baseline_value, target_value, \
         direction, baseline_date, evaluation_date, status \
         FROM objective_progress.objectives",
    );
    if restaurant.is_some() {
        query.push_str(" WHERE restaurant = $1");
    }
    query.push_str(" ORDER BY restaurant, name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = restaurant {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(objective_from_row).collect())
}

pub async fn fetch_snapshots(
    pool: &PgPool,
    objective_id: Uuid,
) -> anyhow::Result<Vec<SnapshotRecord>> {
    let rows = sqlx::query(
        "SELECT objective_id, kpi_value, snapshot_date \
         FROM objective_progress.snapshots \
         WHERE objective_id = $1 \
         ORDER BY snapshot_date ASC",
    )
    .bind(objective_id)
    .fetch_all(pool)
    .await?;

    let mut snapshots = Vec::new();
    for row in rows {
        snapshots.push(SnapshotRecord {
            objective_id: row.get("objective_id"),
            kpi_value: row.get("kpi_value"),
            snapshot_date: row.get("snapshot_date"),
        });
    }

    Ok(snapshots)
}

pub async fn insert_snapshot(
    pool: &PgPool,
    objective_id: Uuid,
    kpi_value: f64,
    snapshot_date: NaiveDate,
) -> anyhow::Result<()> {
    // Readable error for unknown objectives before the FK fires.
    fetch_objective(pool, objective_id).await?;

    sqlx::query(
        r#"
        INSERT INTO objective_progress.snapshots
        (id, objective_id, kpi_value, snapshot_date, source_key)
        VALUES ($1, $2, $3, $4, NULL)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(objective_id)
    .bind(kpi_value)
    .bind(snapshot_date)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        objective: String,
        restaurant: String,
        kpi_name: String,
        kpi_unit: String,
        baseline_value: Option<f64>,
        target_value: Option<f64>,
        direction: String,
        baseline_date: NaiveDate,
        evaluation_date: Option<NaiveDate>,
        kpi_value: f64,
        snapshot_date: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let objective_id: Uuid = sqlx::query(
            r#"
            INSERT INTO objective_progress.objectives
            (id, name, restaurant, kpi_name, kpi_unit, baseline_value, target_value,
             direction, baseline_date, evaluation_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'in_progress')
            ON CONFLICT (name) DO UPDATE
            SET restaurant = EXCLUDED.restaurant,
                baseline_value = EXCLUDED.baseline_value,
                target_value = EXCLUDED.target_value,
                direction = EXCLUDED.direction,
                baseline_date = EXCLUDED.baseline_date,
                evaluation_date = EXCLUDED.evaluation_date
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.objective)
        .bind(&row.restaurant)
        .bind(&row.kpi_name)
        .bind(&row.kpi_unit)
        .bind(row.baseline_value)
        .bind(row.target_value)
        .bind(TargetDirection::parse(&row.direction).as_str())
        .bind(row.baseline_date)
        .bind(row.evaluation_date)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO objective_progress.snapshots
            (id, objective_id, kpi_value, snapshot_date, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(objective_id)
        .bind(row.kpi_value)
        .bind(row.snapshot_date)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
