use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::revocation::RevocationStore;
use crate::auth::tokens::TokenIssuer;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenIssuer>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let tokens = Arc::new(TokenIssuer::from_config(&config));
        let revocations = Arc::new(crate::auth::revocation::SqliteRevocationStore::new(
            db.clone(),
        ));
        Self {
            db,
            config,
            tokens,
            revocations,
        }
    }
}
