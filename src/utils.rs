use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static ARCHIVE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(tar\.gz|zip|tar|gz|tgz)$").expect("archive suffix pattern is valid")
});

/// Human-readable size with one decimal, e.g. `1.5 KB`; whole values drop the decimal.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{rounded:.1} {}", UNITS[unit])
    }
}

/// Archive file name without its archive suffix (`demo.tar.gz` -> `demo`).
pub fn strip_archive_suffix(file_name: &str) -> &str {
    match ARCHIVE_SUFFIX.find(file_name) {
        Some(m) => &file_name[..m.start()],
        None => file_name,
    }
}

/// Output file name: `<project>_<YYYY-MM-DD>.md`.
pub fn output_file_name(project_name: &str, date: NaiveDate) -> String {
    let name = if project_name.is_empty() {
        "project"
    } else {
        project_name
    };
    format!("{name}_{}.md", date.format("%Y-%m-%d"))
}
