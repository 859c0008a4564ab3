use derive_new::new;
use serde::{Deserialize, Serialize};

pub use percentage::*;
pub use timestamp::*;
pub use video::*;
pub use video_id::*;

mod percentage;
mod timestamp;
mod video;
mod video_id;
