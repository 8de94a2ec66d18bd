pub mod estimate;
pub mod listing;
pub mod profile;
pub mod record;
pub mod summary;

pub use estimate::*;
pub use listing::*;
pub use profile::*;
pub use record::*;
pub use summary::*;
