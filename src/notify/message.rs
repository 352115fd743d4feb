//! Alert texts. Bodies use the HTML subset accepted by the chat API, so any
//! user-supplied value is escaped.

use chrono::{DateTime, Local};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn admin_login_alert(identifier: &str, at: DateTime<Local>) -> String {
    format!(
        "🔐 <b>Admin Login</b>\n\nEmail: {}\nTime: {}",
        escape_html(identifier),
        at.format(TIME_FORMAT)
    )
}

pub fn content_change_alert(section: &str, action: &str, at: DateTime<Local>) -> String {
    format!(
        "✏️ <b>Content Update</b>\n\nSection: {}\nAction: {}\nTime: {}",
        escape_html(section),
        escape_html(action),
        at.format(TIME_FORMAT)
    )
}

pub fn contact_submission_alert(name: &str, email: &str, phone: &str, at: DateTime<Local>) -> String {
    format!(
        "📧 <b>New Contact Submission</b>\n\nName: {}\nEmail: {}\nPhone: {}\nTime: {}",
        escape_html(name),
        escape_html(email),
        escape_html(phone),
        at.format(TIME_FORMAT)
    )
}

pub fn review_submission_alert(username: &str, rating: u8, at: DateTime<Local>) -> String {
    format!(
        "⭐ <b>New Review</b>\n\nUser: {}\nRating: {}/5\nTime: {}",
        escape_html(username),
        rating,
        at.format(TIME_FORMAT)
    )
}
