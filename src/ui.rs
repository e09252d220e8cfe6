use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Shorten a distinguished name for display, keeping its leading RDNs
pub fn truncate_dn(dn: &str, max_len: usize) -> String {
    if dn.chars().count() <= max_len {
        dn.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = dn.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Human-readable name of a resource type, plural
pub fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "ou" => "Organizational units",
        "group" => "Groups",
        "user" => "Users",
        "membership" => "Memberships",
        other => other,
    }
}
