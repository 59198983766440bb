//! Preference list negotiation.
//!
//! Named groups, point formats, cipher suites and signature algorithms are
//! all picked the same way: walk the local preference list and take the first
//! entry the peer also lists. What happens when the lists are disjoint is
//! decided by one explicit [`NegotiationPolicy`].

use std::fmt::Debug;

use crate::Error;

/// How to resolve a negotiation with no common entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationPolicy {
    /// Fall back to the first local entry and log a warning.
    ///
    /// Lets a handshake deliberately built with mismatched parameters
    /// carry on.
    #[default]
    Permissive,
    /// Surface [`Error::NegotiationMismatch`] for the operation in progress.
    Strict,
}

/// Pick the first entry of `local` that also appears in `peer`.
///
/// `what` names the list in logs and errors. An empty `local` list is a
/// `PreparationError` under either policy since there is nothing to fall
/// back to.
pub fn negotiate<T>(
    what: &'static str,
    local: &[T],
    peer: &[T],
    policy: NegotiationPolicy,
) -> Result<T, Error>
where
    T: Copy + PartialEq + Debug,
{
    if let Some(found) = local.iter().find(|l| peer.contains(l)) {
        trace!("Negotiated {}: {:?}", what, found);
        return Ok(*found);
    }

    let Some(first) = local.first() else {
        return Err(Error::PreparationError(format!("no local {} configured", what)));
    };

    match policy {
        NegotiationPolicy::Permissive => {
            warn!(
                "No common {} (local {:?}, peer {:?}), using {:?}",
                what, local, peer, first
            );
            Ok(*first)
        }
        NegotiationPolicy::Strict => {
            debug!("No common {} (local {:?}, peer {:?})", what, local, peer);
            Err(Error::NegotiationMismatch(what))
        }
    }
}
