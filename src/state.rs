use crate::db::{DbPool, OrmConn};

/// Shared handles cloned into every handler. The SeaORM connection carries
/// the transactional order/inventory/payment paths; the sqlx pool serves raw
/// reads and the post-commit audit sink.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}
