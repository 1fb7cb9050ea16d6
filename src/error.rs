/// Outcomes of a progress lookup that the page reports to the user.
///
/// Network and parse failures arrive as `Unavailable`; the rest are lookup misses or bad input.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("last name and all date of birth fields are required")]
    MissingFields,

    #[error("date of birth is not a real calendar date")]
    InvalidDob,

    #[error("no student matches that last name and date of birth")]
    StudentNotFound,

    #[error("student not found in grade sheet")]
    NotInGradeSheet,

    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

impl LookupError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LookupError::MissingFields => "Please fill in all fields.",
            LookupError::InvalidDob => {
                "Invalid date of birth. Please check the day, month, and year."
            }
            LookupError::StudentNotFound => {
                "We could not find a student with that last name and date of birth. Please double-check and try again."
            }
            LookupError::NotInGradeSheet | LookupError::Unavailable(_) => {
                "Something went wrong while loading progress. Please refresh and try again."
            }
        }
    }
}
