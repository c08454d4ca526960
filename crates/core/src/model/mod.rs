mod ids;
mod options;
mod session;

pub use ids::{ParseIdError, SessionId, UserId};
pub use options::{
    Association, ClassPeriod, ParseOptionError, SessionLength, SessionType, TeacherEngagement,
    YearGroup,
};
pub use session::{
    GeoPoint, NewSession, SessionDraft, SessionRecord, SessionValidationError, format_time,
};
