use thiserror::Error;

use super::types::{ErrorKind, ParentKey};

#[derive(Error, Debug)]
pub enum GcError {
    #[error("unable to list workflow jobs: {0}")]
    List(#[source] kube::Error),

    #[error("unable to retrieve workflow {key} ({kind}): {source}")]
    TransientResolve {
        key: ParentKey,
        kind: ErrorKind,
        #[source]
        source: kube::Error,
    },

    #[error("unable to delete jobs of workflow {key}: {source}")]
    Delete {
        key: ParentKey,
        #[source]
        source: kube::Error,
    },
}

/// True when the API server answered 404.
pub fn is_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(ae) if ae.code == 404)
}

/// Classify a failed read that is not a 404.
pub fn error_kind(e: &kube::Error) -> ErrorKind {
    match e {
        kube::Error::Api(ae) => match ae.code {
            429 => ErrorKind::Throttled,
            401 | 403 => ErrorKind::Forbidden,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Other,
        },
        kube::Error::HyperError(_)
        | kube::Error::Service(_)
        | kube::Error::HttpError(_) => ErrorKind::Transport,
        _ => ErrorKind::Other,
    }
}
