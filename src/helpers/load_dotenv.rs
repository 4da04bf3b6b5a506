/// Load a local `.env` if present; returns whether one was found
///
/// Runs before the logger is initialised so that `LOG_LEVEL` can come from `.env`.
pub fn load_dotenv() -> bool {
    dotenv::dotenv().is_ok()
}
