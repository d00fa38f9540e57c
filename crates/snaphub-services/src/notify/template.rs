//! Completion email rendering

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use super::{NotificationMessage, UploadSummary};

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y, %H:%M:%S";
const BRAND: &str = "Snap Manage Hub";

pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn local_time(at: DateTime<Utc>, timezone: Tz) -> DateTime<Tz> {
    at.with_timezone(&timezone)
}

pub fn render(summary: &UploadSummary<'_>, timezone: Tz) -> NotificationMessage {
    let local = local_time(summary.completed_at, timezone);
    let timestamp = local.format(TIMESTAMP_FORMAT).to_string();
    let year = local.year();
    let note = summary.note.map(str::trim).filter(|n| !n.is_empty());

    let subject = format!("Upload abgeschlossen - Vorgang #{}", summary.process_number);

    let note_html = note
        .map(|n| format!("<p><strong>Notiz:</strong> {}</p>", escape_html(n)))
        .unwrap_or_default();

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #333; text-align: center;">Upload erfolgreich abgeschlossen</h1>
  <div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h2 style="color: #28a745; margin-top: 0;">Vorgang #{number}</h2>
    <p><strong>Kategorie:</strong> {category}</p>
    <p><strong>Anzahl Dateien:</strong> {count}</p>
    {note}
    <p><strong>Zeitpunkt:</strong> {timestamp}</p>
  </div>
  <div style="background-color: #e9ecef; padding: 15px; border-radius: 8px; margin: 20px 0;">
    <p style="margin: 0; color: #6c757d; font-size: 14px;">
      Diese E-Mail wurde automatisch generiert, um Sie über den erfolgreichen Upload zu informieren.
      Ihre Dateien wurden sicher in unserem System gespeichert.
    </p>
  </div>
  <div style="text-align: center; margin-top: 30px;">
    <p style="color: #6c757d; font-size: 12px;">© {year} {brand} - Alle Rechte vorbehalten</p>
  </div>
</div>"#,
        number = summary.process_number,
        category = escape_html(summary.category),
        count = summary.file_count,
        note = note_html,
        timestamp = timestamp,
        year = year,
        brand = BRAND,
    );

    let mut text = format!(
        "Upload erfolgreich abgeschlossen\n\nVorgang #{}\nKategorie: {}\nAnzahl Dateien: {}\n",
        summary.process_number, summary.category, summary.file_count
    );
    if let Some(n) = note {
        text.push_str(&format!("Notiz: {}\n", n));
    }
    text.push_str(&format!(
        "Zeitpunkt: {}\n\n© {} {} - Alle Rechte vorbehalten\n",
        timestamp, year, BRAND
    ));

    NotificationMessage {
        subject,
        html,
        text,
    }
}
