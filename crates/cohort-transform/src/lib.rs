pub mod delta;
pub mod merge;
pub mod normalize;
pub mod quarantine;

pub use delta::{select_new_students, uuid_set};
pub use merge::merge_records;
pub use normalize::{normalize_courses, normalize_student_jobs, normalize_students};
pub use quarantine::{QuarantineSplit, split_quarantine};
