//! Column names shared across the pipeline.
//!
//! Every crate spells column names through these constants so the source
//! reads, the normalizer, the validators and the store DDL stay in
//! agreement.

pub const UUID: &str = "uuid";
pub const NAME: &str = "name";
pub const DOB: &str = "dob";
pub const SEX: &str = "sex";
pub const CONTACT_INFO: &str = "contact_info";
pub const MAILING_ADDRESS: &str = "mailing_address";
pub const JOB_ID: &str = "job_id";
pub const NUM_COURSE_TAKEN: &str = "num_course_taken";
pub const CURRENT_CAREER_PATH_ID: &str = "current_career_path_id";
pub const TIME_SPENT_HRS: &str = "time_spent_hrs";

pub const AGE: &str = "age";
pub const AGE_GROUP: &str = "age_group";
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const STREET: &str = "street";
pub const CITY: &str = "city";
pub const STATE: &str = "state";
pub const ZIP_CODE: &str = "zip_code";

pub const CAREER_PATH_ID: &str = "career_path_id";
pub const CAREER_PATH_NAME: &str = "career_path_name";
pub const HOURS_TO_COMPLETE: &str = "hours_to_complete";

pub const JOB_CATEGORY: &str = "job_category";
pub const AVG_SALARY: &str = "avg_salary";

/// Column order of a normalized student row, before and after the
/// quarantine split. Committed merged rows extend this with the course and
/// job lookup columns.
pub const CLEANSED_STUDENT_COLUMNS: [&str; 16] = [
    UUID,
    NAME,
    DOB,
    SEX,
    JOB_ID,
    NUM_COURSE_TAKEN,
    CURRENT_CAREER_PATH_ID,
    TIME_SPENT_HRS,
    AGE,
    AGE_GROUP,
    EMAIL,
    PHONE,
    STREET,
    CITY,
    STATE,
    ZIP_CODE,
];

/// Fields with no safe default: a null here routes the row to quarantine.
pub const REQUIRED_COLUMNS: [&str; 2] = [NUM_COURSE_TAKEN, JOB_ID];

/// Fields defaulted to 0 when null on rows that survive the quarantine
/// split.
pub const DEFAULTABLE_COLUMNS: [&str; 2] = [CURRENT_CAREER_PATH_ID, TIME_SPENT_HRS];

/// Identity of the sentinel "no career path" course row.
pub const SENTINEL_CAREER_PATH_ID: i64 = 0;
pub const SENTINEL_CAREER_PATH_NAME: &str = "none";
