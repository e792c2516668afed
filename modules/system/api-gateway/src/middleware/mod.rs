pub mod mime_validation;
pub mod request_id;
