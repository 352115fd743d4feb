pub mod clock;
pub mod error;
pub mod path;
pub mod validate;
pub mod value;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use error::{CmsError, Result};
pub use path::{RecordKey, StorePath};
pub use validate::is_email;
pub use value::{Fields, as_rank, compare_ranks, text_field};
