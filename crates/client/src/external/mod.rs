//! Third-party lookups: address search and company registry data.

mod cnpj;
mod nominatim;

pub use cnpj::{CnpjClient, CnpjInfo, normalize_cnpj};
pub use nominatim::{AddressSuggestion, NominatimClient};
