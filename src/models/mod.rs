pub mod learning_time;
pub mod profile;
pub mod session;

pub use learning_time::{TopicLearningTime, TopicLearningTimeDatabase};
pub use profile::ProfileId;
pub use session::LearningSession;
