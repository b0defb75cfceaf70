use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

const DB_PATH: &str = "data/insights.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS companies (
            id          INTEGER PRIMARY KEY,
            symbol      TEXT UNIQUE NOT NULL,
            cik         TEXT,
            fiscal_year INTEGER,
            start_date  TEXT,
            end_date    TEXT,
            revenue     INTEGER,
            net_income  INTEGER,
            assets      INTEGER,
            liabilities INTEGER,
            fetched_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS recommendations (
            id           INTEGER PRIMARY KEY,
            company_id   INTEGER UNIQUE NOT NULL REFERENCES companies(id),
            narrative    TEXT,
            model        TEXT,
            error        TEXT,
            latency_ms   INTEGER,
            generated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS insight_items (
            id           INTEGER PRIMARY KEY,
            company_id   INTEGER NOT NULL REFERENCES companies(id),
            category     TEXT NOT NULL
                         CHECK(category IN ('insight','recommendation','next_step')),
            position     INTEGER NOT NULL,
            item         TEXT NOT NULL,
            UNIQUE(company_id, category, position)
        );
        CREATE INDEX IF NOT EXISTS idx_items_company ON insight_items(company_id);
        ",
    )?;
    Ok(())
}

// ── Companies ──

/// One company's annual financial facts, as reported. Metrics the filing
/// does not label stay NULL.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyFacts {
    pub symbol: String,
    pub cik: Option<String>,
    pub fiscal_year: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub revenue: Option<i64>,
    pub net_income: Option<i64>,
    pub assets: Option<i64>,
    pub liabilities: Option<i64>,
}

/// Insert or refresh a company row keyed by symbol; returns its id.
pub fn upsert_company(conn: &Connection, facts: &CompanyFacts) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO companies
         (symbol, cik, fiscal_year, start_date, end_date, revenue, net_income, assets, liabilities)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(symbol) DO UPDATE SET
             cik = excluded.cik,
             fiscal_year = excluded.fiscal_year,
             start_date = excluded.start_date,
             end_date = excluded.end_date,
             revenue = excluded.revenue,
             net_income = excluded.net_income,
             assets = excluded.assets,
             liabilities = excluded.liabilities,
             fetched_at = datetime('now')
         RETURNING id",
        rusqlite::params![
            facts.symbol,
            facts.cik,
            facts.fiscal_year,
            facts.start_date,
            facts.end_date,
            facts.revenue,
            facts.net_income,
            facts.assets,
            facts.liabilities,
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct CompanyRow {
    pub id: i64,
    pub facts: CompanyFacts,
}

const COMPANY_COLS: &str =
    "id, symbol, cik, fiscal_year, start_date, end_date, revenue, net_income, assets, liabilities";

fn company_from_row(row: &rusqlite::Row) -> rusqlite::Result<CompanyRow> {
    Ok(CompanyRow {
        id: row.get(0)?,
        facts: CompanyFacts {
            symbol: row.get(1)?,
            cik: row.get(2)?,
            fiscal_year: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            revenue: row.get(6)?,
            net_income: row.get(7)?,
            assets: row.get(8)?,
            liabilities: row.get(9)?,
        },
    })
}

/// Companies with no stored narrative yet. Failed generation attempts are
/// recorded too, so a company is not retried forever.
pub fn fetch_unanalyzed(conn: &Connection, limit: Option<usize>) -> Result<Vec<CompanyRow>> {
    let sql = format!(
        "SELECT {} FROM companies c
         WHERE NOT EXISTS (SELECT 1 FROM recommendations r WHERE r.company_id = c.id)
         ORDER BY c.id{}",
        COMPANY_COLS,
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], company_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Narratives ──

pub struct NarrativeRow {
    pub company_id: i64,
    pub symbol: String,
    pub narrative: Option<String>,
    pub model: Option<String>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
    pub generated_at: String,
}

pub fn prepare_narrative_insert(conn: &Connection) -> Result<rusqlite::Statement<'_>> {
    let stmt = conn.prepare(
        "INSERT OR REPLACE INTO recommendations
         (company_id, narrative, model, error, latency_ms, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    Ok(stmt)
}

pub fn save_narrative(stmt: &mut rusqlite::Statement, row: &NarrativeRow) -> Result<()> {
    stmt.execute(rusqlite::params![
        row.company_id,
        row.narrative,
        row.model,
        row.error,
        row.latency_ms,
        row.generated_at,
    ])?;
    Ok(())
}

pub struct StoredNarrative {
    pub company_id: i64,
    pub symbol: String,
    pub narrative: Option<String>,
}

/// Narratives that have not been segmented into insight items yet.
pub fn fetch_unextracted(conn: &Connection, limit: Option<usize>) -> Result<Vec<StoredNarrative>> {
    let sql = format!(
        "SELECT r.company_id, c.symbol, r.narrative
         FROM recommendations r
         JOIN companies c ON c.id = r.company_id
         WHERE r.error IS NULL
           AND NOT EXISTS (SELECT 1 FROM insight_items i WHERE i.company_id = r.company_id)
         ORDER BY r.company_id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StoredNarrative {
                company_id: row.get(0)?,
                symbol: row.get(1)?,
                narrative: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Insight items ──

pub struct InsightItemRow {
    pub company_id: i64,
    pub category: &'static str,
    pub position: i64,
    pub item: String,
}

/// Replace each touched company's items wholesale so a re-extraction never
/// leaves stale tail entries behind.
pub fn save_insight_items(conn: &Connection, rows: &[InsightItemRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut delete = tx.prepare("DELETE FROM insight_items WHERE company_id = ?1")?;
        let mut seen = std::collections::HashSet::new();
        for r in rows {
            if seen.insert(r.company_id) {
                delete.execute(rusqlite::params![r.company_id])?;
            }
        }

        let mut insert = tx.prepare(
            "INSERT INTO insight_items (company_id, category, position, item)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in rows {
            insert.execute(rusqlite::params![r.company_id, r.category, r.position, r.item])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Cards ──

/// Everything the renderer needs for one company: financial metrics plus
/// the three categorized lists in stored order.
#[derive(Debug, Serialize)]
pub struct Card {
    #[serde(flatten)]
    pub facts: CompanyFacts,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

pub fn fetch_cards(conn: &Connection, symbol: Option<&str>) -> Result<Vec<Card>> {
    let sql = format!(
        "SELECT {} FROM companies{} ORDER BY symbol",
        COMPANY_COLS,
        match symbol {
            Some(_) => " WHERE symbol = ?1",
            None => "",
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let companies: Vec<CompanyRow> = match symbol {
        Some(s) => stmt
            .query_map(rusqlite::params![s], company_from_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], company_from_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    let mut item_stmt = conn.prepare(
        "SELECT category, item FROM insight_items
         WHERE company_id = ?1 ORDER BY category, position",
    )?;

    let mut cards = Vec::with_capacity(companies.len());
    for company in companies {
        let mut insights = Vec::new();
        let mut recommendations = Vec::new();
        let mut next_steps = Vec::new();

        let items = item_stmt
            .query_map(rusqlite::params![company.id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (category, item) in items {
            match category.as_str() {
                "insight" => insights.push(item),
                "recommendation" => recommendations.push(item),
                "next_step" => next_steps.push(item),
                _ => {}
            }
        }

        cards.push(Card {
            facts: company.facts,
            insights,
            recommendations,
            next_steps,
        });
    }
    Ok(cards)
}

// ── Stats ──

pub struct Stats {
    pub companies: usize,
    pub narratives: usize,
    pub errors: usize,
    pub extracted: usize,
    pub items: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let companies: usize = conn.query_row("SELECT COUNT(*) FROM companies", [], |r| r.get(0))?;
    let narratives: usize =
        conn.query_row("SELECT COUNT(*) FROM recommendations", [], |r| r.get(0))?;
    let errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM recommendations WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let extracted: usize = conn.query_row(
        "SELECT COUNT(DISTINCT company_id) FROM insight_items",
        [],
        |r| r.get(0),
    )?;
    let items: usize = conn.query_row("SELECT COUNT(*) FROM insight_items", [], |r| r.get(0))?;
    Ok(Stats {
        companies,
        narratives,
        errors,
        extracted,
        items,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn facts(symbol: &str) -> CompanyFacts {
        CompanyFacts {
            symbol: symbol.to_string(),
            cik: Some("0000320193".to_string()),
            fiscal_year: Some(2023),
            start_date: Some("2022-09-25".to_string()),
            end_date: Some("2023-09-30".to_string()),
            revenue: Some(383_285_000_000),
            net_income: Some(96_995_000_000),
            assets: Some(352_583_000_000),
            liabilities: Some(290_437_000_000),
        }
    }

    #[test]
    fn upsert_is_stable_by_symbol() {
        let conn = test_conn();
        let id1 = upsert_company(&conn, &facts("AAPL")).unwrap();
        let id2 = upsert_company(&conn, &facts("AAPL")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(get_stats(&conn).unwrap().companies, 1);
    }

    #[test]
    fn reextraction_replaces_items_wholesale() {
        let conn = test_conn();
        let id = upsert_company(&conn, &facts("MSFT")).unwrap();

        let long: Vec<InsightItemRow> = (0..3)
            .map(|i| InsightItemRow {
                company_id: id,
                category: "insight",
                position: i,
                item: format!("old {}", i),
            })
            .collect();
        save_insight_items(&conn, &long).unwrap();

        let short = vec![InsightItemRow {
            company_id: id,
            category: "insight",
            position: 0,
            item: "new".to_string(),
        }];
        save_insight_items(&conn, &short).unwrap();

        let cards = fetch_cards(&conn, Some("MSFT")).unwrap();
        assert_eq!(cards[0].insights, vec!["new"]);
    }

    #[test]
    fn cards_keep_item_order() {
        let conn = test_conn();
        let id = upsert_company(&conn, &facts("GOOGL")).unwrap();
        let rows = vec![
            InsightItemRow {
                company_id: id,
                category: "recommendation",
                position: 1,
                item: "second".to_string(),
            },
            InsightItemRow {
                company_id: id,
                category: "recommendation",
                position: 0,
                item: "first".to_string(),
            },
        ];
        save_insight_items(&conn, &rows).unwrap();
        let cards = fetch_cards(&conn, None).unwrap();
        assert_eq!(cards[0].recommendations, vec!["first", "second"]);
    }

    #[test]
    fn unanalyzed_excludes_companies_with_narratives() {
        let conn = test_conn();
        let a = upsert_company(&conn, &facts("AAPL")).unwrap();
        upsert_company(&conn, &facts("MSFT")).unwrap();

        let mut stmt = prepare_narrative_insert(&conn).unwrap();
        save_narrative(
            &mut stmt,
            &NarrativeRow {
                company_id: a,
                symbol: "AAPL".to_string(),
                narrative: Some("**Revenue**: text".to_string()),
                model: Some("llama-3.1-8b-instant".to_string()),
                error: None,
                latency_ms: Some(412),
                generated_at: "2024-01-01T00:00:00Z".to_string(),
            },
        )
        .unwrap();
        drop(stmt);

        let pending = fetch_unanalyzed(&conn, None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].facts.symbol, "MSFT");

        let unextracted = fetch_unextracted(&conn, None).unwrap();
        assert_eq!(unextracted.len(), 1);
        assert_eq!(unextracted[0].symbol, "AAPL");
    }
}
