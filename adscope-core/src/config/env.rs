use anyhow::Result;
use tracing::{debug, warn};

/// Load environment variables from a `.env` file in the working directory.
///
/// A missing file is not an error; a malformed one is logged and skipped.
pub fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded environment variables");
            Ok(())
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!(error = %e, "failed to load .env file");
            Ok(())
        }
    }
}
