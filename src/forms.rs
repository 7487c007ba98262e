use actix_multipart::Multipart;
use actix_web::{error, Error};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;

/// A single field-level validation failure, rendered next to the form.
#[derive(Debug, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_owned(),
        }
    }
}

/// An uploaded file pulled out of a multipart stream.
pub struct UploadPayload {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: mime::Mime,
}

/// Raw submission for post create/edit: `text`, optional `group`,
/// optional `image` file.
#[derive(Default)]
pub struct PostFormData {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: Option<UploadPayload>,
}

#[derive(Deserialize)]
pub struct CommentFormData {
    pub text: String,
}

#[derive(Deserialize)]
pub struct LoginFormData {
    pub username: String,
}

/// Reads the post form out of a multipart request body.
///
/// Unknown fields are drained and dropped. An empty `group` selection and
/// a file part without a filename both map to None.
pub async fn read_post_form(mut multipart: Multipart) -> Result<PostFormData, Error> {
    let mut form = PostFormData::default();

    while let Ok(Some(mut field)) = multipart.try_next().await {
        let disposition = field.content_disposition();
        let name = disposition
            .get_name()
            .ok_or_else(|| error::ErrorBadRequest("read_post_form: unnamed multipart field"))?
            .to_owned();
        let filename = disposition.get_filename().map(str::to_owned);
        let content_type = field.content_type().clone();

        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                log::error!("read_post_form: multipart read error: {}", e);
                error::ErrorBadRequest("read_post_form: error reading form data")
            })?;
            buf.extend(bytes);
        }

        match name.as_str() {
            "text" => {
                form.text = String::from_utf8(buf)
                    .map_err(|_| error::ErrorBadRequest("read_post_form: text is not utf-8"))?;
            }
            "group" => {
                let raw = String::from_utf8(buf)
                    .map_err(|_| error::ErrorBadRequest("read_post_form: group is not utf-8"))?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    form.group_id = Some(raw.parse::<i32>().map_err(|_| {
                        error::ErrorBadRequest("read_post_form: group is not an id")
                    })?);
                }
            }
            "image" => {
                if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                    if !buf.is_empty() {
                        form.image = Some(UploadPayload {
                            data: buf,
                            filename,
                            content_type,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Constraints for post create/edit: non-empty text, image uploads must
/// carry an image content type.
pub fn validate_post_form(form: &PostFormData) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if form.text.trim().is_empty() {
        errors.push(FieldError::new("text", "Post text must not be empty."));
    }
    if let Some(image) = &form.image {
        if image.content_type.type_() != mime::IMAGE {
            errors.push(FieldError::new("image", "Upload must be an image."));
        }
    }

    errors
}

/// Constraints for adding a comment: non-empty text.
pub fn validate_comment_form(form: &CommentFormData) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if form.text.trim().is_empty() {
        errors.push(FieldError::new("text", "Comment text must not be empty."));
    }

    errors
}

/// Constraints for the login form: non-empty username.
pub fn validate_login_form(form: &LoginFormData) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if form.username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username must not be empty."));
    }

    errors
}
