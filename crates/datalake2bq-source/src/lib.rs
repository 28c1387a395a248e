// datalake2bq-source - Analytics data-extraction API client
//
// Logs in with client credentials, walks the export metadata listing page by
// page and resolves each page's export ids to signed download URLs.

mod auth;
mod client;
mod error;
mod paginator;
mod resolver;

pub use auth::{login, AccessToken, Credentials};
pub use client::{format_window_start, SourceClient};
pub use error::{Result, SourceError};
pub use paginator::list_pages;
