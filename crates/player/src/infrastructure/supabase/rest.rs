//! PostgREST adapter for the hosted store.
//!
//! Upserts are `POST /rest/v1/<table>?on_conflict=<key columns>` with
//! `Prefer: resolution=merge-duplicates`, so re-sending a row is idempotent.
//! Reads are eq-filtered selects.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use partysheet_domain::SHARED_SCORE_ROW_ID;
use partysheet_shared::{
    AdversityRow, AimgRow, InventoryRow, RemoteRow, ScoreRow, StatRow, StatusRow, Table,
};

use crate::ports::outbound::{RemoteStorePort, StoreError};

const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    rest_url: Url,
    anon_key: String,
}

impl PostgrestStore {
    /// `project_url` is the project root, e.g. `https://xyz.supabase.co`.
    pub fn new(project_url: &Url, anon_key: impl Into<String>) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: Client::new(),
            rest_url: project_url.join("rest/v1/")?,
            anon_key: anon_key.into(),
        })
    }

    fn table_url(&self, table: Table, query: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self
            .rest_url
            .join(table.name())
            .map_err(|e| StoreError::transport("build url", e))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        table: Table,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, query)?;
        tracing::trace!(%url, "Selecting rows");
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| StoreError::transport(operation, e))?;
        let response = check(operation, response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(StoreError::serialization)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        table: Table,
        filters: &[(&str, &str)],
    ) -> Result<Option<T>, StoreError> {
        let mut query = vec![("select", "*".to_string()), ("limit", "1".to_string())];
        query.extend(filters.iter().map(|(column, value)| (*column, eq(value))));
        let rows = self.select(operation, table, &query).await?;
        Ok(rows.into_iter().next())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

async fn check(operation: &'static str, response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::rejected(operation, status.as_u16(), body))
}

#[async_trait]
impl RemoteStorePort for PostgrestStore {
    async fn upsert(&self, row: RemoteRow) -> Result<(), StoreError> {
        let table = row.table();
        let url = self.table_url(
            table,
            &[("on_conflict", table.conflict_columns().join(","))],
        )?;
        let body = row.to_json().map_err(StoreError::serialization)?;

        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", PREFER_UPSERT)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::transport("upsert", e))?;
        check("upsert", response).await?;
        tracing::trace!(table = %table, "Row upserted");
        Ok(())
    }

    async fn delete_inventory_item(&self, id: Uuid) -> Result<(), StoreError> {
        let url = self.table_url(Table::Inventory, &[("id", eq(&id.to_string()))])?;
        let response = self
            .authorized(self.client.delete(url))
            .send()
            .await
            .map_err(|e| StoreError::transport("delete_inventory_item", e))?;
        check("delete_inventory_item", response).await?;
        Ok(())
    }

    async fn fetch_adversity(&self, player: &str) -> Result<Option<AdversityRow>, StoreError> {
        self.select_one("fetch_adversity", Table::Adversity, &[("player", player)])
            .await
    }

    async fn fetch_status(&self, player: &str) -> Result<Option<StatusRow>, StoreError> {
        self.select_one("fetch_status", Table::Status, &[("player", player)])
            .await
    }

    async fn fetch_stat(&self, player: &str, stat: &str) -> Result<Option<StatRow>, StoreError> {
        self.select_one(
            "fetch_stat",
            Table::Stats,
            &[("player", player), ("stat", stat)],
        )
        .await
    }

    async fn fetch_inventory(&self, player: &str) -> Result<Vec<InventoryRow>, StoreError> {
        let query = [
            ("select", "*".to_string()),
            ("player", eq(player)),
            ("order", "order.asc".to_string()),
        ];
        self.select("fetch_inventory", Table::Inventory, &query)
            .await
    }

    async fn fetch_secondary_dial(&self, player: &str) -> Result<Option<AimgRow>, StoreError> {
        self.select_one("fetch_secondary_dial", Table::Aimg, &[("player", player)])
            .await
    }

    async fn fetch_shared_score(&self) -> Result<Option<ScoreRow>, StoreError> {
        let id = SHARED_SCORE_ROW_ID.to_string();
        self.select_one("fetch_shared_score", Table::EltaisScore, &[("id", id.as_str())])
            .await
    }
}
