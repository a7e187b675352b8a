//! The single self-contained HTML report document.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

/// A numbered category section of the document.
#[derive(Debug)]
pub struct Section {
    pub title: String,
    pub entries: Vec<Entry>,
}

/// One plot inside a section. `image` is the path of the rendered chart
/// relative to the report directory, without extension.
#[derive(Debug)]
pub struct Entry {
    pub title: String,
    pub image: String,
}

/// Write `index.html` into the report directory. The images are referenced
/// relatively, so the directory can be moved or shared as a whole.
pub fn write_document(
    report_dir: &Path,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    sections: &[Section],
    tables: &[String],
) -> io::Result<()> {
    let path = report_dir.join("index.html");
    let mut f = File::create(&path)?;

    writeln!(f, "<!DOCTYPE html>")?;
    writeln!(f, "<html><head><meta charset=\"utf-8\">")?;
    writeln!(f, "<title>FANs, Temperatures and Power Utilization</title>")?;
    writeln!(f, "<style>")?;
    writeln!(f, "  body {{ font-family: sans-serif; margin: 2em auto; max-width: 1000px; }}")?;
    writeln!(f, "  img.graph {{ max-width: 100%; border: 1px solid #ccc; margin: 0.5em 0; }}")?;
    writeln!(f, "  p.subtitle {{ color: #555; }}")?;
    writeln!(f, "  footer {{ color: #999; font-size: 0.85em; margin-top: 3em; }}")?;
    writeln!(f, "</style></head><body>")?;
    writeln!(f, "<h1>FANs, Temperatures and Power Utilization</h1>")?;
    writeln!(
        f,
        "<p class=\"subtitle\">Monitoring period: from {} to {} - UTC</p>",
        first.format("%d-%B-%Y - %H:%M:%S"),
        last.format("%d-%B-%Y - %H:%M:%S")
    )?;

    writeln!(f, "<h2>Table of Contents</h2>")?;
    writeln!(f, "<ul>")?;
    for (si, section) in sections.iter().enumerate() {
        writeln!(
            f,
            "<li><a href=\"#{}\">{}. {}</a>",
            anchor(&section.title),
            si + 1,
            section.title
        )?;
        writeln!(f, "<ul>")?;
        for (ei, entry) in section.entries.iter().enumerate() {
            writeln!(
                f,
                "<li><a href=\"#{}\">{}.{} {}</a></li>",
                anchor(&entry.title),
                si + 1,
                ei + 1,
                entry.title
            )?;
        }
        writeln!(f, "</ul></li>")?;
    }
    writeln!(f, "</ul>")?;

    for (si, section) in sections.iter().enumerate() {
        writeln!(
            f,
            "<h2 id=\"{}\">{}. {}</h2>",
            anchor(&section.title),
            si + 1,
            section.title
        )?;
        if section.entries.is_empty() {
            writeln!(f, "<p>No {} plots found.</p>", section.title)?;
        }
        for (ei, entry) in section.entries.iter().enumerate() {
            writeln!(
                f,
                "<h3 id=\"{}\">{}.{} {}</h3>",
                anchor(&entry.title),
                si + 1,
                ei + 1,
                entry.title
            )?;
            // Vector image first, raster fallback when it is missing.
            writeln!(
                f,
                "<img class=\"graph\" src=\"{img}.svg\" onerror=\"this.onerror=null;this.src='{img}.png';\" alt=\"{alt}\">",
                img = entry.image,
                alt = entry.title
            )?;
        }
    }

    if !tables.is_empty() {
        writeln!(f, "<h2 id=\"summary-tables\">Summary Tables</h2>")?;
        writeln!(f, "<ul>")?;
        for table in tables {
            writeln!(f, "<li><a href=\"{table}\">{table}</a></li>")?;
        }
        writeln!(f, "</ul>")?;
    }

    writeln!(f, "<footer>Generated {}</footer>", Utc::now().format("%d-%B-%Y"))?;
    writeln!(f, "</body></html>")?;
    Ok(())
}

fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
