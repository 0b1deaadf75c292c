//! Digest report rendering — pure HTML/CSV generation over a day's questions.

use chrono::NaiveDate;
use chrono_tz::Tz;

use herald_common::types::HrQuestion;

/// Subject line carries the date and the item count so the mail is
/// self-describing in a crowded inbox.
pub fn subject(date: NaiveDate, count: usize) -> String {
    let noun = if count == 1 { "question" } else { "questions" };
    format!("HR digest {} — {} open {}", date, count, noun)
}

/// Render the inline HTML table. Timestamps are shown in the reporting zone.
pub fn render_html(date: NaiveDate, items: &[HrQuestion], zone: Tz) -> String {
    let mut html = String::new();
    html.push_str("<html><body>");
    html.push_str(&format!(
        "<h2>HR questions for {}</h2><p>{} item(s). Full data attached as CSV.</p>",
        date,
        items.len()
    ));
    html.push_str("<table border=\"1\" cellpadding=\"4\" cellspacing=\"0\">");
    html.push_str(
        "<tr><th>#</th><th>Time</th><th>Question</th><th>Name</th>\
         <th>Email</th><th>Phone</th><th>Emailed</th><th>Resolved</th><th>Id</th></tr>",
    );

    for (i, item) in items.iter().enumerate() {
        let local = item.created_at.with_timezone(&zone);
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            i + 1,
            local.format("%H:%M"),
            escape_html(&item.question),
            escape_html(&item.name),
            escape_html(item.email.as_deref().unwrap_or("-")),
            escape_html(item.phone.as_deref().unwrap_or("-")),
            yes_no(item.emailed),
            yes_no(item.resolved),
            item.id,
        ));
    }

    html.push_str("</table></body></html>");
    html
}

/// Render the CSV attachment. One row per question, header first.
pub fn render_csv(items: &[HrQuestion], zone: Tz) -> String {
    let mut csv = String::from("index,time,question,name,email,phone,emailed,resolved,id\n");

    for (i, item) in items.iter().enumerate() {
        let local = item.created_at.with_timezone(&zone);
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            i + 1,
            local.format("%Y-%m-%d %H:%M:%S"),
            escape_csv(&item.question),
            escape_csv(&item.name),
            escape_csv(item.email.as_deref().unwrap_or("")),
            escape_csv(item.phone.as_deref().unwrap_or("")),
            item.emailed,
            item.resolved,
            item.id,
        ));
    }

    csv
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn question(text: &str, name: &str) -> HrQuestion {
        HrQuestion {
            id: Uuid::new_v4(),
            question: text.to_string(),
            name: name.to_string(),
            email: Some("asker@acme.test".to_string()),
            phone: None,
            emailed: false,
            resolved: false,
            created_at: Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_subject_carries_date_and_count() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(subject(date, 3), "HR digest 2024-06-03 — 3 open questions");
        assert_eq!(subject(date, 1), "HR digest 2024-06-03 — 1 open question");
    }

    #[test]
    fn test_html_escapes_markup() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let items = vec![question("Is <b>overtime</b> paid?", "A & B")];
        let html = render_html(date, &items, chrono_tz::UTC);
        assert!(html.contains("Is &lt;b&gt;overtime&lt;/b&gt; paid?"));
        assert!(html.contains("A &amp; B"));
        assert!(!html.contains("<b>overtime</b>"));
    }

    #[test]
    fn test_html_renders_local_time() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let items = vec![question("Parking?", "Ana Li")];
        // 09:30 UTC is 11:30 in Berlin during DST
        let html = render_html(date, &items, chrono_tz::Europe::Berlin);
        assert!(html.contains("11:30"));
    }

    #[test]
    fn test_html_includes_record_id() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let items = vec![question("Parking?", "Ana Li")];
        let html = render_html(date, &items, chrono_tz::UTC);
        assert!(html.contains("<th>Id</th>"));
        assert!(html.contains(&format!("<td>{}</td></tr>", items[0].id)));
    }

    #[test]
    fn test_csv_header_and_rows() {
        let items = vec![question("Parking?", "Ana Li")];
        let csv = render_csv(&items, chrono_tz::UTC);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "index,time,question,name,email,phone,emailed,resolved,id"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,2024-06-03 09:30:00,Parking?,Ana Li,"));
        assert!(row.contains(&items[0].id.to_string()));
    }

    #[test]
    fn test_csv_quotes_embedded_delimiters() {
        let items = vec![question("Why, though?", "\"Ana\"")];
        let csv = render_csv(&items, chrono_tz::UTC);
        assert!(csv.contains("\"Why, though?\""));
        assert!(csv.contains("\"\"\"Ana\"\"\""));
    }
}
