//! PostgREST (Supabase) implementation of [`PredictionStore`].

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::{FinishedQuery, PredictionStore, UpcomingQuery};
use crate::config::StoreCredentials;
use crate::http_client::http_client;
use crate::model::{Event, FinishedEvent, OddsRow, Prediction};
use crate::normalize::{RawEvent, RawFinishedRow, RawOddsRow, normalize_all};

/// PostgREST caps responses at this many rows by default.
const PAGE_SIZE: usize = 1000;

pub struct RestStore {
    client: &'static Client,
    base_url: String,
    service_key: String,
}

impl RestStore {
    pub fn new(creds: &StoreCredentials) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: format!("{}/rest/v1", creds.url),
            service_key: creds.service_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.base_url)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.service_key))
    }

    fn get_json(&self, table: &str, query: &[(&str, String)]) -> Result<String> {
        let req = self.authed(self.client.get(self.table_url(table)).query(query));
        let resp = req
            .send()
            .with_context(|| format!("{table} request failed"))?;
        read_success_body(resp, table)
    }
}

impl PredictionStore for RestStore {
    fn finished_events(&self, query: &FinishedQuery) -> Result<Vec<FinishedEvent>> {
        let params = vec![
            (
                "select",
                "event_id,winner_key,events!inner(sport_key,commence_time_utc,home_name,away_name)"
                    .to_string(),
            ),
            ("events.sport_key", like_prefix(&query.sport_prefix)),
            ("order", "created_at.desc".to_string()),
            ("limit", query.limit.to_string()),
        ];
        let body = self.get_json("results", &params)?;
        parse_finished_json(&body)
    }

    fn odds_for_events(&self, event_ids: &[String], market_key: &str) -> Result<Vec<OddsRow>> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        let mut offset = 0usize;
        loop {
            let params = vec![
                (
                    "select",
                    "event_id,outcome_key,outcome_name,price,snapshot_time_utc".to_string(),
                ),
                ("event_id", in_list(event_ids)),
                ("market_key", format!("eq.{market_key}")),
                ("order", "id.asc".to_string()),
                ("limit", PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ];
            let body = self.get_json("odds_snapshots", &params)?;
            let raw: Vec<RawOddsRow> =
                serde_json::from_str(body.trim()).context("invalid odds_snapshots json")?;
            let fetched = raw.len();
            let (rows, dropped) = normalize_all(&raw, RawOddsRow::normalize);
            debug!(offset, fetched, dropped, "odds page");
            out.extend(rows);
            if fetched < PAGE_SIZE {
                break;
            }
            offset += fetched;
        }
        Ok(out)
    }

    fn upcoming_events(&self, query: &UpcomingQuery) -> Result<Vec<Event>> {
        let params = vec![
            (
                "select",
                "id,sport_key,commence_time_utc,home_name,away_name".to_string(),
            ),
            ("sport_key", like_prefix(&query.sport_prefix)),
            ("commence_time_utc", format!("gte.{}", query.from.to_rfc3339())),
            ("commence_time_utc", format!("lte.{}", query.to.to_rfc3339())),
            ("order", "commence_time_utc.asc".to_string()),
            ("limit", query.limit.to_string()),
        ];
        let body = self.get_json("events", &params)?;
        parse_events_json(&body)
    }

    fn replace_predictions(
        &mut self,
        model_version: &str,
        event_ids: &[String],
        rows: &[Prediction],
    ) -> Result<()> {
        if !event_ids.is_empty() {
            let url = self.table_url("predictions");
            let query = [
                ("model_version", format!("eq.{model_version}")),
                ("event_id", in_list(event_ids)),
            ];
            let resp = self
                .authed(self.client.delete(url).query(&query))
                .send()
                .context("predictions delete failed")?;
            read_success_body(resp, "predictions delete")?;
        }

        if !rows.is_empty() {
            let body = serde_json::to_string(rows).context("serialize predictions")?;
            let resp = self
                .authed(self.client.post(self.table_url("predictions")))
                .header(CONTENT_TYPE, "application/json")
                .header("Prefer", "return=minimal")
                .body(body)
                .send()
                .context("predictions insert failed")?;
            read_success_body(resp, "predictions insert")?;
        }
        Ok(())
    }
}

pub fn parse_finished_json(raw: &str) -> Result<Vec<FinishedEvent>> {
    let rows: Option<Vec<RawFinishedRow>> =
        serde_json::from_str(raw.trim()).context("invalid results json")?;
    let rows = rows.unwrap_or_default();
    Ok(normalize_all(&rows, RawFinishedRow::normalize).0)
}

pub fn parse_odds_json(raw: &str) -> Result<Vec<OddsRow>> {
    let rows: Option<Vec<RawOddsRow>> =
        serde_json::from_str(raw.trim()).context("invalid odds_snapshots json")?;
    let rows = rows.unwrap_or_default();
    Ok(normalize_all(&rows, RawOddsRow::normalize).0)
}

pub fn parse_events_json(raw: &str) -> Result<Vec<Event>> {
    let rows: Option<Vec<RawEvent>> =
        serde_json::from_str(raw.trim()).context("invalid events json")?;
    let rows = rows.unwrap_or_default();
    Ok(normalize_all(&rows, RawEvent::normalize).0)
}

/// `like` filter matching values that start with `prefix` literally.
fn like_prefix(prefix: &str) -> String {
    let mut out = String::from("like.");
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_' | '*') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('*');
    out
}

fn in_list(ids: &[String]) -> String {
    let quoted = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({quoted})")
}

fn read_success_body(resp: Response, what: &str) -> Result<String> {
    let status = resp.status();
    let body = resp
        .text()
        .with_context(|| format!("failed reading {what} body"))?;
    if !status.is_success() {
        let snippet = body
            .trim()
            .replace(['\n', '\r'], " ")
            .chars()
            .take(220)
            .collect::<String>();
        return Err(anyhow!("{what} http {status}: {snippet}"));
    }
    Ok(body)
}
