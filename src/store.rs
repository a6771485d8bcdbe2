//! Persistence backend
//!
//! The sync driver only needs six operations; `DrawStore` names them and
//! `PocketBaseStore` implements them over the PocketBase REST API.

use crate::error::{Result, SyncError};
use crate::model::{sort_slots, Draw, Set, Slot};
use crate::schema::{
    AuthRequest, AuthResponse, CreatedRecord, ListResponse, SetBody, SlotBody, SlotRecord,
};
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const DRAW_FIELDS: &str = "id,name,event,year,url,start_date,end_date,prediction_close,size";

/// Large enough for a full 128 draw (255 slots) in one page
const SLOTS_PER_PAGE: &str = "255";

/// Operations the sync driver needs from storage
pub trait DrawStore {
    /// Draws whose end date has not passed
    fn list_active_draws(&self) -> impl Future<Output = Result<Vec<Draw>>> + Send;

    /// Persisted slots of a draw with their set scores, sorted by key
    fn list_slots(&self, draw_id: &str) -> impl Future<Output = Result<Vec<Slot>>> + Send;

    /// Returns the new slot's id
    fn create_slot(&self, slot: &Slot) -> impl Future<Output = Result<String>> + Send;

    fn update_slot(&self, id: &str, slot: &Slot) -> impl Future<Output = Result<()>> + Send;

    /// Returns the new set's id
    fn create_set(&self, set: &Set) -> impl Future<Output = Result<String>> + Send;

    fn update_set(&self, id: &str, set: &Set) -> impl Future<Output = Result<()>> + Send;
}

/// Authenticated PocketBase client
pub struct PocketBaseStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PocketBaseStore {
    /// Authenticate with the script user; failure is fatal for the run
    pub async fn login(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| SyncError::Http {
                url: base_url.clone(),
                source,
            })?;

        let url = format!("{}/api/collections/user/auth-with-password", base_url);
        let response = client
            .post(&url)
            .json(&AuthRequest {
                identity: username,
                password,
            })
            .send()
            .await
            .map_err(|source| SyncError::Http {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(SyncError::Auth(format!("HTTP {}", response.status().as_u16())));
        }

        let auth: AuthResponse = decode(response, &url).await?;
        if auth.token.is_empty() {
            return Err(SyncError::Auth("empty token".to_string()));
        }

        Ok(Self {
            client,
            base_url,
            token: auth.token,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
    }

    async fn execute(&self, request: RequestBuilder, method: &'static str, url: &str) -> Result<Response> {
        let response = request.send().await.map_err(|source| SyncError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(method, url, status = status.as_u16(), "backend response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    response.json().await.map_err(|source| SyncError::Decode {
        url: url.to_string(),
        source,
    })
}

impl DrawStore for PocketBaseStore {
    async fn list_active_draws(&self) -> Result<Vec<Draw>> {
        let url = self.collection_url("draw");
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let filter = format!("(end_date>=\"{}\")", today);

        let request = self
            .request(Method::GET, &url)
            .query(&[("filter", filter.as_str()), ("fields", DRAW_FIELDS)]);
        let response = self.execute(request, "GET", &url).await?;
        let list: ListResponse<Draw> = decode(response, &url).await?;

        Ok(list.items)
    }

    async fn list_slots(&self, draw_id: &str) -> Result<Vec<Slot>> {
        let url = self.collection_url("slots_with_scores");
        let filter = format!("(draw_id=\"{}\")", draw_id);

        let request = self.request(Method::GET, &url).query(&[
            ("perPage", SLOTS_PER_PAGE),
            ("filter", filter.as_str()),
            ("skipTotal", "true"),
        ]);
        let response = self.execute(request, "GET", &url).await?;
        let list: ListResponse<SlotRecord> = decode(response, &url).await?;

        let mut slots: Vec<Slot> = list.items.into_iter().map(SlotRecord::into_slot).collect();
        sort_slots(&mut slots);
        Ok(slots)
    }

    async fn create_slot(&self, slot: &Slot) -> Result<String> {
        let url = self.collection_url("draw_slot");
        let request = self.request(Method::POST, &url).json(&SlotBody::from(slot));
        let response = self.execute(request, "POST", &url).await?;
        let created: CreatedRecord = decode(response, &url).await?;
        Ok(created.id)
    }

    async fn update_slot(&self, id: &str, slot: &Slot) -> Result<()> {
        let url = self.record_url("draw_slot", id);
        let request = self.request(Method::PATCH, &url).json(&SlotBody::from(slot));
        self.execute(request, "PATCH", &url).await?;
        Ok(())
    }

    async fn create_set(&self, set: &Set) -> Result<String> {
        let url = self.collection_url("set_score");
        let request = self.request(Method::POST, &url).json(&SetBody::from(set));
        let response = self.execute(request, "POST", &url).await?;
        let created: CreatedRecord = decode(response, &url).await?;
        Ok(created.id)
    }

    async fn update_set(&self, id: &str, set: &Set) -> Result<()> {
        let url = self.record_url("set_score", id);
        let request = self.request(Method::PATCH, &url).json(&SetBody::from(set));
        self.execute(request, "PATCH", &url).await?;
        Ok(())
    }
}
