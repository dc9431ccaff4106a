// Library root for the rotisserie draft engine: roster setup, snake turn
// order, pick validation and the pre-pick queue. Performs no I/O; card lookup
// and sheet mirroring are driven by the caller.

pub mod draft;
pub mod error;

pub use draft::card::{CardInfo, Legality};
pub use draft::config::{DraftConfig, Format};
pub use draft::player::{Player, PlayerId};
pub use draft::state::{DraftEngine, DraftInfo, FireOutcome};
pub use draft::pick::{PickOutcome, Placement, ResolvedPick};
pub use draft::snapshot::{DraftSnapshot, SnapshotError};
pub use error::{Action, DraftError};
