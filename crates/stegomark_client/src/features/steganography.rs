use serde::{Deserialize, Serialize};

use super::{Feature, InputSlot};
use crate::resource::PreviewStrategy;
use crate::ValidationError;

pub const MAX_MESSAGE_CHARS: usize = 10_000;

pub struct MessageEmbed;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageEmbedParams {
    pub message: String,
    pub use_encryption: bool,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedMessageOutput {
    pub success: bool,
    pub message_length: u64,
    pub bits_used: u64,
    pub capacity: u64,
    pub usage_percent: f64,
    pub encrypted: bool,
    pub psnr: f64,
    pub ssim: f64,
    /// Data URL of the stego image.
    pub stego_image: String,
}

impl Feature for MessageEmbed {
    type Params = MessageEmbedParams;
    type Output = EmbedMessageOutput;

    const NAME: &'static str = "message embed";
    const ENDPOINT: &'static str = "/api/steganography/embed";
    const INPUTS: &'static [InputSlot] =
        &[InputSlot::required("cover_image", PreviewStrategy::Inline)];

    fn validate(params: &Self::Params) -> Result<(), ValidationError> {
        if params.message.is_empty() {
            return Err(ValidationError::Empty { field: "message" });
        }
        let len = params.message.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ValidationError::TooLong {
                field: "message",
                len,
                max: MAX_MESSAGE_CHARS,
            });
        }
        if params.use_encryption && params.password.is_empty() {
            return Err(ValidationError::Required {
                field: "password",
                reason: "encryption is enabled",
            });
        }
        Ok(())
    }

    fn fields(params: &Self::Params) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("message", params.message.clone()),
            ("use_encryption", params.use_encryption.to_string()),
        ];
        if !params.password.is_empty() {
            fields.push(("password", params.password.clone()));
        }
        fields
    }
}

pub struct MessageExtract;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageExtractParams {
    /// Empty means the message was embedded without encryption.
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractMessageOutput {
    pub message: String,
    pub length: u64,
}

impl Feature for MessageExtract {
    type Params = MessageExtractParams;
    type Output = ExtractMessageOutput;

    const NAME: &'static str = "message extract";
    const ENDPOINT: &'static str = "/api/steganography/extract";
    const INPUTS: &'static [InputSlot] =
        &[InputSlot::required("stego_image", PreviewStrategy::Inline)];

    fn validate(_params: &Self::Params) -> Result<(), ValidationError> {
        Ok(())
    }

    fn fields(params: &Self::Params) -> Vec<(&'static str, String)> {
        let use_decryption = !params.password.is_empty();
        let mut fields = vec![("use_decryption", use_decryption.to_string())];
        if use_decryption {
            fields.push(("password", params.password.clone()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_length_counts_characters() {
        let params = MessageEmbedParams {
            message: "é".repeat(MAX_MESSAGE_CHARS),
            ..Default::default()
        };
        assert_eq!(MessageEmbed::validate(&params), Ok(()));

        let params = MessageEmbedParams {
            message: "x".repeat(MAX_MESSAGE_CHARS + 1),
            ..Default::default()
        };
        assert_eq!(
            MessageEmbed::validate(&params),
            Err(ValidationError::TooLong {
                field: "message",
                len: MAX_MESSAGE_CHARS + 1,
                max: MAX_MESSAGE_CHARS,
            })
        );
    }

    #[test]
    fn encryption_needs_a_password() {
        let params = MessageEmbedParams {
            message: "hi".into(),
            use_encryption: true,
            password: String::new(),
        };
        assert!(matches!(
            MessageEmbed::validate(&params),
            Err(ValidationError::Required { field: "password", .. })
        ));
    }
}
