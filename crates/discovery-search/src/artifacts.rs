//! Artifacts that mention a domain.

use std::sync::Arc;

use discovery_core::AttributeKind;

use crate::context::SearchContext;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::request::ArtifactsRequest;
use crate::store::Artifact;

/// Shared, immutable artifact list as stored in the artifacts cache.
pub type ArtifactList = Arc<Vec<Artifact>>;

/// `true` if the artifact's domain attribute equals `domain`, or its URL
/// contains it, ignoring case. `domain` must already be lower-cased.
#[must_use]
pub fn artifact_mentions_domain(artifact: &Artifact, domain: &str) -> bool {
    if artifact
        .text(AttributeKind::Domain)
        .is_some_and(|d| d.trim().to_lowercase() == domain)
    {
        return true;
    }
    artifact
        .text(AttributeKind::Url)
        .is_some_and(|url| url.to_lowercase().contains(domain))
}

/// Scan every artifact of the requested type for ones mentioning the
/// requested domain. Cancellation is checked per artifact.
pub fn load_artifacts(request: &ArtifactsRequest, context: &SearchContext) -> DiscoveryResult<ArtifactList> {
    context.check("artifact lookup")?;
    let label = request.artifact_type().display_name();
    let candidates = request
        .store()
        .artifacts_of_type(request.artifact_type())
        .map_err(|err| DiscoveryError::store(label, err))?;

    let mut matches = Vec::new();
    for artifact in candidates {
        context.check("artifact lookup")?;
        if artifact_mentions_domain(&artifact, request.domain()) {
            matches.push(artifact);
        }
    }
    tracing::debug!(
        domain = request.domain(),
        artifact_type = label,
        matches = matches.len(),
        "loaded domain artifacts"
    );
    Ok(Arc::new(matches))
}
