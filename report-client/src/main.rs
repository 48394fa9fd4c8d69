// src/main.rs

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeekInfo {
    key: String,
    label: String,
    decision: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Report {
    id: u64,
    business_unit: String,
    division: String,
    week: String,
    highlight_of_week: String,
    business_development: String,
    planned_activities: String,
    urgent_issues: Vec<Value>,
    submitted_by: String,
    submitted_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriorityIssue {
    issue_number: String,
    business_unit: String,
    division: String,
    description: String,
    aging_days: i64,
    status: String,
}

const BUSINESS_UNIT: &str = "ERP";
const DIVISION: &str = "Oracle Fusion";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url = env::var("WEEKLY_REPORTS_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;
    println!("Health check response: {:?}", health);
    if health.status != "ok" {
        return Err(format!("unexpected health status '{}'", health.status).into());
    }

    // Test 2: Current week
    println!("\n🔍 Reading the current week...");
    let week = client
        .get(format!("{}/api/weeks/current", base_url))
        .send()
        .await?
        .json::<WeekInfo>()
        .await?;
    println!("Current week: {} ({}) is {}", week.key, week.label, week.decision);

    // Test 3: Submit a report
    println!("\n🔍 Submitting a report for {} / {}...", BUSINESS_UNIT, DIVISION);
    let submission = json!({
        "businessUnit": BUSINESS_UNIT,
        "division": DIVISION,
        "week": week.key,
        "highlightOfWeek": "Smoke test highlight",
        "businessDevelopment": "Smoke test pipeline",
        "plannedActivities": "Smoke test plans",
        "urgentIssues": [
            { "description": "Smoke test issue needing action", "requiresAction": true }
        ],
        "submittedBy": "report-client"
    });
    let submitted = post_report(&client, &base_url, &submission).await?;
    println!("Saved report {} with {} issue(s)", submitted.id, submitted.urgent_issues.len());

    // Test 4: Read it back
    println!("\n🔍 Reading the report back...");
    let fetched = client
        .get(format!(
            "{}/api/reports/{}/{}/{}",
            base_url,
            week.key,
            BUSINESS_UNIT,
            DIVISION.replace(' ', "%20")
        ))
        .send()
        .await?
        .json::<Report>()
        .await?;
    println!("Read back: {:?}", fetched);
    if fetched != submitted {
        return Err("report read back differs from the submitted one".into());
    }

    // Test 5: Blank update must not change anything
    println!("\n🔍 Submitting an all-blank update...");
    let blank = json!({
        "businessUnit": BUSINESS_UNIT,
        "division": DIVISION,
        "week": week.key,
        "highlightOfWeek": "",
        "businessDevelopment": "   ",
        "plannedActivities": "",
        "urgentIssues": [],
        "submittedBy": "report-client"
    });
    let after_blank = post_report(&client, &base_url, &blank).await?;
    if after_blank == fetched {
        println!("✅ Blank update left the report unchanged");
    } else {
        println!("❌ Blank update changed the report: {:?}", after_blank);
        return Err("blank update modified stored content".into());
    }

    // Test 6: Priority board
    println!("\n🔍 Priority issues (oldest first)...");
    let board = client
        .get(format!("{}/api/issues/priority?sort=aging&order=desc", base_url))
        .send()
        .await?
        .json::<Vec<PriorityIssue>>()
        .await?;
    for issue in &board {
        println!(
            "  {} [{}] {} / {}: {} ({} day(s))",
            issue.issue_number,
            issue.status,
            issue.business_unit,
            issue.division,
            issue.description,
            issue.aging_days
        );
    }
    println!("\n✅ All checks passed ({} open priority issue(s))", board.len());

    Ok(())
}

async fn post_report(client: &Client, base_url: &str, body: &Value) -> Result<Report, Box<dyn Error>> {
    let response = client
        .post(format!("{}/api/reports", base_url))
        .json(body)
        .send()
        .await?;
    let status = response.status();
    if status != StatusCode::OK {
        let text = response.text().await?;
        return Err(format!("submit failed with {}: {}", status, text).into());
    }
    Ok(response.json::<Report>().await?)
}
