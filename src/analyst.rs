use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::{self, CompanyRow, NarrativeRow};

const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const MODEL: &str = "llama-3.1-8b-instant";
const SYSTEM_PROMPT: &str = "You are a business analyst providing company performance insights.";

const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Generation stats returned after completion.
pub struct AnalyzeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Generate a narrative per company concurrently, saving each result to DB
/// as it arrives. Failures are stored with their error message so the
/// company is not retried on the next run.
pub async fn analyze_streaming(
    conn: &Connection,
    companies: Vec<CompanyRow>,
) -> Result<AnalyzeStats> {
    let api_key = std::env::var("GROQ_API_KEY")
        .map_err(|_| anyhow::anyhow!("GROQ_API_KEY environment variable must be set"))?;
    let api_key = Arc::new(api_key);
    let client = reqwest::Client::new();
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = companies.len();

    // Channel: workers send results, main loop saves to DB
    let (tx, mut rx) = tokio::sync::mpsc::channel::<NarrativeRow>(CONCURRENCY * 2);

    for company in companies {
        let client = client.clone();
        let api_key = Arc::clone(&api_key);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            let row = generate_with_retry(&client, &api_key, &company).await;
            let _ = tx.send(row).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut stmt = db::prepare_narrative_insert(conn)?;
    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
            warn!("Narrative failed for {}: {:?}", row.symbol, row.error);
        } else {
            ok += 1;
        }
        db::save_narrative(&mut stmt, &row)?;
    }

    info!("Generated {} narratives ({} ok, {} errors)", total, ok, errors);
    Ok(AnalyzeStats { total, ok, errors })
}

async fn generate_with_retry(
    client: &reqwest::Client,
    api_key: &str,
    company: &CompanyRow,
) -> NarrativeRow {
    for attempt in 0..MAX_RETRIES {
        match generate_one(client, api_key, company).await {
            Ok(row) => return row,
            Err(RequestError::RateLimited) => {
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "Rate limited on {} (attempt {}/{}), backing off {:.1}s",
                    company.facts.symbol,
                    attempt + 1,
                    MAX_RETRIES,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
            }
            Err(RequestError::Fatal(e)) => return error_row(company, &e),
        }
    }

    match generate_one(client, api_key, company).await {
        Ok(row) => row,
        Err(RequestError::RateLimited) => error_row(company, "rate limit retries exhausted"),
        Err(RequestError::Fatal(e)) => error_row(company, &e),
    }
}

enum RequestError {
    RateLimited,
    Fatal(String),
}

async fn generate_one(
    client: &reqwest::Client,
    api_key: &str,
    company: &CompanyRow,
) -> Result<NarrativeRow, RequestError> {
    let summary = match serde_json::to_string(&company.facts) {
        Ok(json) => format!("Company financials: {}", json),
        Err(_) => "No financial data available.".to_string(),
    };

    let payload = ChatRequest {
        model: MODEL,
        messages: vec![
            Message {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user",
                content: format!(
                    "Generate performance insights and recommendations based on this data:\n{}",
                    summary
                ),
            },
        ],
        temperature: 0.7,
    };

    let start = Instant::now();
    let response = client
        .post(GROQ_URL)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| RequestError::Fatal(e.to_string()))?;
    let elapsed = start.elapsed().as_millis() as i64;

    let status = response.status();
    if status.as_u16() == 429 || status.is_server_error() {
        return Err(RequestError::RateLimited);
    }
    if !status.is_success() {
        return Err(RequestError::Fatal(format!("Groq API error: {}", status)));
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| RequestError::Fatal(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| RequestError::Fatal("No choices in Groq response".to_string()))?;

    Ok(NarrativeRow {
        company_id: company.id,
        symbol: company.facts.symbol.clone(),
        narrative: Some(content),
        model: Some(MODEL.to_string()),
        error: None,
        latency_ms: Some(elapsed),
        generated_at: Utc::now().to_rfc3339(),
    })
}

fn error_row(company: &CompanyRow, error: &str) -> NarrativeRow {
    NarrativeRow {
        company_id: company.id,
        symbol: company.facts.symbol.clone(),
        narrative: None,
        model: Some(MODEL.to_string()),
        error: Some(error.to_string()),
        latency_ms: None,
        generated_at: Utc::now().to_rfc3339(),
    }
}
