use super::ValidationError;

pub const MAX_NAME_LENGTH: usize = 255;

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    super::require("name", name)?;

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name",
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}
