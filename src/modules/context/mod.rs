// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::MailHeraldResult;

pub trait Initialize {
    async fn initialize() -> MailHeraldResult<()>;
}
