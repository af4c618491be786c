use rand::seq::{IndexedRandom, IteratorRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub domain: String,
    pub subdomain: String,
    pub missing_piece: String,
}

/// Picks a domain, one of its subdomains and a missing piece, each uniformly
/// and independently. The catalog must be non-empty.
pub fn select_random<R: Rng + ?Sized>(catalog: &Catalog, rng: &mut R) -> Selection {
    let (domain, subdomains) = catalog
        .domains
        .iter()
        .choose(rng)
        .map(|(domain, subdomains)| (domain.clone(), subdomains.as_slice()))
        .unwrap_or_default();
    let subdomain = subdomains.choose(rng).cloned().unwrap_or_default();
    let missing_piece = catalog
        .missing_pieces
        .keys()
        .choose(rng)
        .cloned()
        .unwrap_or_default();

    Selection {
        domain,
        subdomain,
        missing_piece,
    }
}
