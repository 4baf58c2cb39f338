use sqlx::PgConnection;

/// A handle to an active database connection which can be lent out to queries
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Provides access to the systems this service talks to (the database and outbound HTTP).
/// Driven adapters receive one of these instead of owning clients themselves, which keeps
/// them swappable in tests.
pub trait ExternalConnectivity: Sync {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;

    fn http_client(&self) -> &reqwest_middleware::ClientWithMiddleware;
}
