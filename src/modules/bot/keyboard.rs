// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::{json, Value};

pub const BTN_MARK: &str = "BTN_MARK";
pub const BTN_READ: &str = "BTN_READ";

/// One inline button: `unique` routes the callback, `payload` carries the
/// button's argument (the decimal UID for envelope buttons).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ButtonDescriptor {
    pub unique: String,
    pub label: String,
    pub payload: String,
}

/// Grid factory for inline buttons; buttons fill rows left to right,
/// `columns` per row.
#[derive(Clone, Debug)]
pub struct InlineKeyboard {
    columns: usize,
    buttons: Vec<ButtonDescriptor>,
}

impl InlineKeyboard {
    pub fn new(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            buttons: Vec::new(),
        }
    }

    pub fn add(&mut self, label: &str, unique: &str, payload: &str) {
        self.buttons.push(ButtonDescriptor {
            unique: unique.to_string(),
            label: label.to_string(),
            payload: payload.to_string(),
        });
    }

    /// `reply_markup` value for the chat API.
    pub fn markup(&self) -> Value {
        let rows: Vec<Value> = self
            .buttons
            .chunks(self.columns)
            .map(|row| {
                Value::Array(
                    row.iter()
                        .map(|button| {
                            json!({
                                "text": button.label,
                                "callback_data": callback_data(&button.unique, &button.payload),
                            })
                        })
                        .collect(),
                )
            })
            .collect();
        json!({ "inline_keyboard": rows })
    }
}

/// Buttons attached to every envelope announcement.
pub fn envelope_keyboard(uid: u32) -> InlineKeyboard {
    let payload = uid.to_string();
    let mut keyboard = InlineKeyboard::new(2);
    keyboard.add("📩 Mark as read", BTN_MARK, &payload);
    keyboard.add("📧 Read", BTN_READ, &payload);
    keyboard
}

pub fn callback_data(unique: &str, payload: &str) -> String {
    format!("{}:{}", unique, payload)
}

pub fn parse_callback_data(data: &str) -> Option<(&str, &str)> {
    data.split_once(':')
}

/// A decoded button press, as handed to the dispatcher.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ButtonEvent {
    pub chat_id: i64,
    pub unique: String,
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_buttons_fill_one_two_column_row() {
        let markup = envelope_keyboard(42).markup();
        let rows = markup["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows[0].as_array().unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row[0]["text"], "📩 Mark as read");
        assert_eq!(row[0]["callback_data"], "BTN_MARK:42");
        assert_eq!(row[1]["text"], "📧 Read");
        assert_eq!(row[1]["callback_data"], "BTN_READ:42");
    }

    #[test]
    fn buttons_wrap_to_new_rows() {
        let mut keyboard = InlineKeyboard::new(2);
        keyboard.add("a", "U1", "1");
        keyboard.add("b", "U2", "2");
        keyboard.add("c", "U3", "3");
        let markup = keyboard.markup();
        let rows = markup["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].as_array().unwrap().len(), 1);
    }

    #[test]
    fn callback_data_round_trips() {
        let data = callback_data(BTN_READ, "42");
        assert_eq!(parse_callback_data(&data), Some((BTN_READ, "42")));
        assert_eq!(parse_callback_data("garbage"), None);
    }
}
