use std::sync::Arc;

use crate::auth::AuthService;
use crate::cache::RoomCache;
use crate::config::Config;
use crate::service::{AccountService, RoomService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub accounts: Arc<AccountService>,
    pub rooms: Arc<RoomService>,
    pub cache: Arc<RoomCache>,
}

impl AppState {
    pub fn new(
        config: Config,
        auth: Arc<AuthService>,
        accounts: AccountService,
        rooms: RoomService,
        cache: Arc<RoomCache>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            auth,
            accounts: Arc::new(accounts),
            rooms: Arc::new(rooms),
            cache,
        }
    }
}
