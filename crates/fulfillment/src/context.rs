use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::UserId;
use document_store::DocumentStore;

use crate::{Clock, FulfillmentConfig, FulfillmentError, Repository, Result, UserDirectory};

/// Collaborators shared by every service.
#[derive(Clone)]
pub(crate) struct Context<S> {
    pub repo: Repository<S>,
    pub clock: Arc<dyn Clock>,
    pub users: Arc<dyn UserDirectory>,
    pub config: FulfillmentConfig,
}

impl<S: DocumentStore> Context<S> {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fails with `NotFound` unless the user exists.
    pub async fn ensure_user(&self, user_id: UserId) -> Result<()> {
        if self.users.exists(user_id).await? {
            Ok(())
        } else {
            Err(FulfillmentError::not_found("user", user_id))
        }
    }
}
