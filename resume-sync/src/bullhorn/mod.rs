//! Bullhorn: the destination platform holding candidates, categories and candidate files.
//!
//! Every REST call needs a [`Session`], obtained by [`SessionManager::acquire_session`]:
//!
//! 1. Exchange the refresh token for an access token at `{auth_url}/oauth/token`
//! 2. If the refresh token is rejected with `invalid_grant` and a username and password are
//!    configured, log in headlessly through `/oauth/authorize` and exchange the resulting
//!    authorization code instead
//! 3. Trade the access token for a `BhRestToken` and a per-session REST URL at
//!    `/rest-services/login`
//!
//! A 401 or 403 from step 3 restarts the acquisition once. Sessions are not cached.

pub mod candidates;
pub mod oauth;
pub mod query;
pub mod session;

pub use candidates::{BullhornClient, FileUpload};
pub use oauth::TokenResponse;
pub use session::{Session, SessionManager};
