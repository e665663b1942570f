pub mod controller;
pub mod tracker;

pub use controller::TopicLearningTimeController;
pub use tracker::{ActiveTimeListener, LearningSessionTracker, TrackerStatus};
