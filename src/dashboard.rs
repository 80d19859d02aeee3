use crate::error::LoadError;
use crate::scope::CountryScoper;
use std::sync::Arc;
use tracing::{error, info};

/// Load lifecycle of the dataset. Nothing is exposed while loading; a
/// failed load keeps whatever was loaded before it.
#[derive(Clone)]
pub enum Dashboard {
    Loading {
        previous: Option<Arc<CountryScoper>>,
    },
    Ready(Arc<CountryScoper>),
    Failed {
        message: String,
        previous: Option<Arc<CountryScoper>>,
    },
}

impl Default for Dashboard {
    fn default() -> Self {
        Dashboard::Loading { previous: None }
    }
}

impl Dashboard {
    /// Starts a new load, remembering the current data in case it fails.
    pub fn begin_reload(&self) -> Dashboard {
        Dashboard::Loading {
            previous: self.retained(),
        }
    }

    fn retained(&self) -> Option<Arc<CountryScoper>> {
        match self {
            Dashboard::Loading { previous } | Dashboard::Failed { previous, .. } => previous.clone(),
            Dashboard::Ready(scoper) => Some(scoper.clone()),
        }
    }

    pub fn finish(&self, result: Result<CountryScoper, LoadError>) -> Dashboard {
        match result {
            Ok(scoper) => {
                info!("Dataset ready with {} libraries", scoper.collection().len());
                Dashboard::Ready(Arc::new(scoper))
            }
            Err(e) => {
                let message = format!("Could not load the library dataset: {}", e);
                error!("{}", message);
                Dashboard::Failed {
                    message,
                    previous: self.retained(),
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Dashboard::Loading { .. })
    }

    pub fn scoper(&self) -> Option<Arc<CountryScoper>> {
        match self {
            Dashboard::Ready(scoper) => Some(scoper.clone()),
            Dashboard::Failed { previous, .. } => previous.clone(),
            Dashboard::Loading { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Dashboard::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}
