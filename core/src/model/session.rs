use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated session as handed back by the auth endpoint.
/// Serializable so the CLI can persist it between invocations and
/// hand it to `AuthApi::restore` on the next start.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}
