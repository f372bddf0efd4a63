use crate::domain::Sender;

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Inline mention of a user: a `tg://user` link labelled with their name.
pub fn mention_html(sender: &Sender) -> String {
    format!(
        r#"<a href="tg://user?id={}">{}</a>"#,
        sender.id.0,
        escape_html(&sender.full_name)
    )
}

/// Greeting sent for `/start` and `/ping`.
pub fn greeting_html(sender: Option<&Sender>) -> String {
    match sender {
        Some(s) => format!("Hi {}!", mention_html(s)),
        None => "Hi!".to_string(),
    }
}
