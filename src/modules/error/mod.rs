// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::ErrorCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MailHeraldError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type MailHeraldResult<T, E = MailHeraldError> = std::result::Result<T, E>;

impl MailHeraldError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MailHeraldError::Generic { code, .. } => *code,
        }
    }
}
