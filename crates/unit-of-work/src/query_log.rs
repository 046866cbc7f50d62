/// Logs `query` and runs `op`.
pub fn log_query<T, F>(query: &str, op: F) -> T
where
    F: FnOnce() -> T,
{
    log::info!("Executing query: {query}");
    op()
}
