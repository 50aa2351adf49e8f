/// Render `text` as a framed banner
pub fn render(text: &str) -> String {
    let width = text.chars().count() + 4;
    let rule = "═".repeat(width);
    format!("╔{rule}╗\n║  {text}  ║\n╚{rule}╝")
}
