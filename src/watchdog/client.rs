//! HTTP client for the watchdog backend.
//!
//! Authentication and adding actions report failures to the caller. The
//! listing calls used to build the dashboard log failures and degrade to an
//! empty result so the page can still render an empty state.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use time::Date;
use url::Url;

use crate::{
    Error,
    watchdog::models::{
        ActionType, AuthenticationCredential, AuthenticationOk, DeadletterAction,
        DeadletterResponse, NewAction, Page, UserProfile,
    },
};

/// The number of transactions requested per listing call.
pub const DEFAULT_LISTING_PAGE_SIZE: u32 = 500;

/// Where the watchdog backend lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Base URL of the dead-letter service, e.g. "https://api.example.com/watchdog".
    pub service_url: String,
    /// Base URL of the authentication service.
    pub auth_url: String,
    /// How long to wait for a response before giving up.
    pub request_timeout: Duration,
    /// The page size sent with transaction listing requests.
    pub listing_page_size: u32,
}

/// A cheaply cloneable client for the watchdog REST API.
#[derive(Debug, Clone)]
pub struct WatchdogClient {
    http: Client,
    service_url: Url,
    auth_url: Url,
    listing_page_size: u32,
}

/// Whether `transaction_id` could have been issued by the backend.
///
/// IDs are sent as a single path segment, so the empty string and the dot
/// segments, which URL normalisation would drop, are rejected along with
/// anything holding control characters.
pub fn is_valid_transaction_id(transaction_id: &str) -> bool {
    !transaction_id.trim().is_empty()
        && !matches!(transaction_id, "." | "..")
        && !transaction_id.chars().any(char::is_control)
}

impl WatchdogClient {
    /// Create a client from `config`.
    ///
    /// # Errors
    /// - [Error::InvalidBackendUrl] if either base URL cannot carry a path.
    /// - [Error::BackendUnavailable] if the underlying HTTP client cannot be built.
    pub fn new(config: WatchdogConfig) -> Result<Self, Error> {
        let service_url = parse_base_url(&config.service_url)?;
        let auth_url = parse_base_url(&config.auth_url)?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .inspect_err(|error| tracing::error!("could not build HTTP client: {error}"))?;

        Ok(Self {
            http,
            service_url,
            auth_url,
            listing_page_size: config.listing_page_size.max(1),
        })
    }

    /// Exchange a username and password for a redirect URL carrying the token.
    ///
    /// # Errors
    /// - [Error::MalformedAuthenticationRequest] on a 400 response.
    /// - [Error::InvalidCredentials] on a 401 response.
    /// - [Error::AuthenticationFailed] on any other unsuccessful status.
    /// - [Error::BackendUnavailable] if the request could not be sent.
    pub async fn authenticate(
        &self,
        credential: &AuthenticationCredential,
    ) -> Result<AuthenticationOk, Error> {
        let response = self
            .http
            .post(join_segments(&self.auth_url, &["authenticate"]))
            .json(credential)
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST => Err(Error::MalformedAuthenticationRequest),
            StatusCode::UNAUTHORIZED => Err(Error::InvalidCredentials),
            status if !status.is_success() => Err(Error::AuthenticationFailed(status.as_u16())),
            _ => Ok(response.json().await?),
        }
    }

    /// Get the profile of the operator that owns `token`.
    pub async fn fetch_user(&self, token: &str) -> Result<UserProfile, Error> {
        let response = self
            .http
            .get(join_segments(&self.service_url, &["users"]))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "/users").await
    }

    /// Get every dead-letter transaction inserted on `date`.
    ///
    /// Pages are requested one after the other until `page.total` rows have
    /// been read or the backend runs out of rows. If a later page fails the
    /// rows read so far are returned, and `page.total` still reports how many
    /// the backend holds.
    ///
    /// Returns `None` if the first page cannot be fetched.
    pub async fn fetch_transactions(&self, token: &str, date: Date) -> Option<DeadletterResponse> {
        let first_page = self
            .try_fetch_transactions_page(token, date, 0)
            .await
            .inspect_err(|error| {
                tracing::error!("Failed to fetch deadletter transactions for {date}: {error}")
            })
            .ok()?;

        let total = first_page.page.total;
        let mut transactions = first_page.deadletter_transactions;
        let mut page_number = 1;

        while (transactions.len() as u64) < total {
            let page = match self
                .try_fetch_transactions_page(token, date, page_number)
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    tracing::error!(
                        "Failed to fetch page {page_number} of deadletter transactions for \
                        {date}, keeping {} of {total}: {error}",
                        transactions.len()
                    );
                    break;
                }
            };

            if page.deadletter_transactions.is_empty() {
                tracing::warn!(
                    "The backend reported {total} deadletter transactions for {date} but \
                    page {page_number} was empty"
                );
                break;
            }

            transactions.extend(page.deadletter_transactions);
            page_number += 1;
        }

        Some(DeadletterResponse {
            page: Page {
                current: page_number.saturating_sub(1),
                results: transactions.len() as u64,
                total,
            },
            deadletter_transactions: transactions,
        })
    }

    async fn try_fetch_transactions_page(
        &self,
        token: &str,
        date: Date,
        page_number: u64,
    ) -> Result<DeadletterResponse, Error> {
        let mut url = join_segments(&self.service_url, &["deadletter-transactions"]);
        url.query_pairs_mut()
            .append_pair("date", &date.to_string())
            .append_pair("pageNumber", &page_number.to_string())
            .append_pair("pageSize", &self.listing_page_size.to_string());

        let response = self.http.get(url).bearer_auth(token).send().await?;

        parse_json(response, "/deadletter-transactions").await
    }

    /// Get the action history of a single transaction.
    ///
    /// Returns an empty list if the request fails for any reason.
    pub async fn fetch_actions(&self, token: &str, transaction_id: &str) -> Vec<DeadletterAction> {
        self.try_fetch_actions(token, transaction_id)
            .await
            .inspect_err(|error| {
                tracing::error!("Failed to fetch actions for {transaction_id:?}: {error}")
            })
            .unwrap_or_default()
    }

    async fn try_fetch_actions(
        &self,
        token: &str,
        transaction_id: &str,
    ) -> Result<Vec<DeadletterAction>, Error> {
        let url = self.transaction_actions_url(transaction_id)?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        parse_json(response, "/deadletter-transactions/{id}/actions").await
    }

    /// Record the action labelled `value` against a transaction.
    ///
    /// # Errors
    /// - [Error::InvalidTransactionId] if `transaction_id` cannot name a transaction.
    /// - [Error::AddActionFailed] if the backend rejects the action.
    /// - [Error::BackendUnavailable] if the request could not be sent.
    pub async fn add_action(
        &self,
        token: &str,
        transaction_id: &str,
        value: &str,
    ) -> Result<(), Error> {
        let url = self.transaction_actions_url(transaction_id)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&NewAction { value })
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::error!(
                "Failed to add action {value:?} to deadletter transaction {transaction_id}: status {}",
                response.status()
            );
            return Err(Error::AddActionFailed(transaction_id.to_owned()));
        }

        Ok(())
    }

    /// Get the catalog of actions operators can choose from.
    ///
    /// Returns an empty list if the request fails for any reason.
    pub async fn fetch_action_types(&self, token: &str) -> Vec<ActionType> {
        self.try_fetch_action_types(token)
            .await
            .inspect_err(|error| tracing::error!("Failed to fetch action types: {error}"))
            .unwrap_or_default()
    }

    async fn try_fetch_action_types(&self, token: &str) -> Result<Vec<ActionType>, Error> {
        let response = self
            .http
            .get(join_segments(&self.service_url, &["actions"]))
            .bearer_auth(token)
            .send()
            .await?;

        parse_json(response, "/actions").await
    }

    fn transaction_actions_url(&self, transaction_id: &str) -> Result<Url, Error> {
        if !is_valid_transaction_id(transaction_id) {
            return Err(Error::InvalidTransactionId(transaction_id.to_owned()));
        }

        Ok(join_segments(
            &self.service_url,
            &["deadletter-transactions", transaction_id, "actions"],
        ))
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, Error> {
    match Url::parse(base_url) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        _ => Err(Error::InvalidBackendUrl(base_url.to_owned())),
    }
}

/// Append `segments` to the path of `base`, percent-encoding each one.
fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();

    // Base URLs are checked in `WatchdogClient::new`, so they always have path segments.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }

    url
}

async fn parse_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, Error> {
    let status = response.status();

    if !status.is_success() {
        return Err(Error::BackendStatus {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
        });
    }

    Ok(response.json().await?)
}
